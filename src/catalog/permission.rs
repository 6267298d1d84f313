//! Object permissions: who may mutate which part of the catalog.
//!
//! Authority always flows from the root restaurant's `admin_users`; a menu,
//! section or item is never checked on its own.

use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{
    entity::{Entity, EntityKind, Restaurant},
    error::CatalogError,
    storage::CatalogStore,
};
use crate::accounts::User;

/// An authenticated user as seen by the permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub is_staff: bool,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            is_staff: user.is_staff,
        }
    }
}

/// The requesting identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User(Principal),
}

impl Actor {
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Anonymous => None,
            Self::User(principal) => Some(principal),
        }
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.principal().is_some_and(|principal| principal.is_staff)
    }
}

impl From<Option<Principal>> for Actor {
    fn from(principal: Option<Principal>) -> Self {
        principal.map_or(Self::Anonymous, Self::User)
    }
}

/// Kind of access requested. Reads are the "safe methods".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Mutate,
}

pub struct PermissionResolver<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CatalogStore + ?Sized> PermissionResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Walks parent links up to the restaurant that owns `target`.
    ///
    /// # Errors
    /// A parent id that no longer resolves is a `ContractViolation`; store
    /// failures propagate.
    pub async fn resolve_owning_restaurant(
        &self,
        target: &Entity,
    ) -> Result<Restaurant, CatalogError> {
        let mut current = target.clone();
        loop {
            let (parent_kind, parent_id) = match &current {
                Entity::Restaurant(restaurant) => return Ok(restaurant.clone()),
                Entity::Menu(menu) => (EntityKind::Restaurant, menu.restaurant_id),
                Entity::MenuSection(section) => (EntityKind::Menu, section.menu_id),
                Entity::MenuItem(item) => (EntityKind::MenuSection, item.section_id),
            };
            let Some(parent) = self.store.get(parent_kind, parent_id).await? else {
                error!(
                    kind = %current.kind(),
                    id = %current.id(),
                    parent = %parent_id,
                    "broken ancestry while resolving owning restaurant"
                );
                return Err(CatalogError::ContractViolation(
                    "entity ancestry does not resolve to a restaurant",
                ));
            };
            current = parent;
        }
    }

    /// `true` when `actor` is staff or administers the restaurant owning `target`.
    ///
    /// # Errors
    /// See [`Self::resolve_owning_restaurant`].
    pub async fn can_mutate(&self, actor: &Actor, target: &Entity) -> Result<bool, CatalogError> {
        let Some(principal) = actor.principal() else {
            return Ok(false);
        };
        if principal.is_staff {
            return Ok(true);
        }
        let restaurant = self.resolve_owning_restaurant(target).await?;
        Ok(restaurant.is_admin(principal.user_id))
    }

    /// Object permission gate.
    ///
    /// Anonymous actors are refused outright, staff always pass, reads pass for
    /// any authenticated user, and mutations defer to [`Self::can_mutate`].
    ///
    /// # Errors
    /// A mutation without a target entity is a `ContractViolation`.
    pub async fn has_object_permission(
        &self,
        actor: &Actor,
        access: Access,
        target: Option<&Entity>,
    ) -> Result<bool, CatalogError> {
        let Some(principal) = actor.principal() else {
            return Ok(false);
        };
        if principal.is_staff {
            return Ok(true);
        }
        if access == Access::Read {
            return Ok(true);
        }
        let Some(target) = target else {
            error!("object permission checked for a mutation without a target entity");
            return Err(CatalogError::ContractViolation(
                "object permission requires a catalog entity",
            ));
        };
        self.can_mutate(actor, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        entity::{Menu, MenuItem, MenuSection, Theme},
        storage::{CatalogStore, MemoryStore, UserStore},
    };

    struct Fixture {
        store: MemoryStore,
        admin: Actor,
        outsider: Actor,
        staff: Actor,
        entities: Vec<Entity>,
    }

    fn user(username: &str, is_staff: bool) -> User {
        User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            is_staff,
        }
    }

    async fn fixture() -> anyhow::Result<Fixture> {
        let store = MemoryStore::new();
        let admin = user("admin", false);
        let outsider = user("outsider", false);
        let staff = user("staff", true);
        for user in [&admin, &outsider, &staff] {
            store.create_user(user).await?;
        }

        let mut restaurant = Restaurant::new("Pizza Place");
        restaurant.admin_users.insert(admin.id);
        let menu = Menu::new(restaurant.id, "Lunch", Theme::Default);
        let section = MenuSection::new(menu.id, "Pies");
        let item = MenuItem::new(section.id, "Margherita", "Tomato and basil");
        let entities: Vec<Entity> = vec![
            restaurant.into(),
            menu.into(),
            section.into(),
            item.into(),
        ];
        for entity in &entities {
            store.create(entity).await?;
        }

        Ok(Fixture {
            store,
            admin: Actor::User(admin.into()),
            outsider: Actor::User(outsider.into()),
            staff: Actor::User(staff.into()),
            entities,
        })
    }

    #[tokio::test]
    async fn owning_restaurant_resolves_from_every_kind() -> anyhow::Result<()> {
        let fixture = fixture().await?;
        let resolver = PermissionResolver::new(&fixture.store);
        let root_id = fixture.entities[0].id();
        for entity in &fixture.entities {
            let restaurant = resolver.resolve_owning_restaurant(entity).await?;
            assert_eq!(restaurant.id, root_id, "wrong owner for {}", entity.kind());
        }
        Ok(())
    }

    #[tokio::test]
    async fn can_mutate_only_for_admins_across_kinds() -> anyhow::Result<()> {
        let fixture = fixture().await?;
        let resolver = PermissionResolver::new(&fixture.store);
        for entity in &fixture.entities {
            assert!(resolver.can_mutate(&fixture.admin, entity).await?);
            assert!(!resolver.can_mutate(&fixture.outsider, entity).await?);
            assert!(!resolver.can_mutate(&Actor::Anonymous, entity).await?);
        }
        Ok(())
    }

    #[tokio::test]
    async fn gate_refuses_anonymous_even_for_reads() -> anyhow::Result<()> {
        let fixture = fixture().await?;
        let resolver = PermissionResolver::new(&fixture.store);
        let target = Some(&fixture.entities[0]);
        assert!(
            !resolver
                .has_object_permission(&Actor::Anonymous, Access::Read, target)
                .await?
        );
        assert!(
            !resolver
                .has_object_permission(&Actor::Anonymous, Access::Mutate, target)
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn gate_passes_staff_and_reads() -> anyhow::Result<()> {
        let fixture = fixture().await?;
        let resolver = PermissionResolver::new(&fixture.store);
        assert!(
            resolver
                .has_object_permission(&fixture.staff, Access::Mutate, None)
                .await?
        );
        assert!(
            resolver
                .has_object_permission(&fixture.outsider, Access::Read, None)
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn gate_checks_admin_for_each_kind() -> anyhow::Result<()> {
        let fixture = fixture().await?;
        let resolver = PermissionResolver::new(&fixture.store);
        for entity in &fixture.entities {
            assert!(
                resolver
                    .has_object_permission(&fixture.admin, Access::Mutate, Some(entity))
                    .await?
            );
            assert!(
                !resolver
                    .has_object_permission(&fixture.outsider, Access::Mutate, Some(entity))
                    .await?
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn mutation_without_target_fails_loudly() -> anyhow::Result<()> {
        let fixture = fixture().await?;
        let resolver = PermissionResolver::new(&fixture.store);
        let result = resolver
            .has_object_permission(&fixture.admin, Access::Mutate, None)
            .await;
        assert!(matches!(result, Err(CatalogError::ContractViolation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn broken_ancestry_is_a_contract_violation() {
        let store = MemoryStore::new();
        let resolver = PermissionResolver::new(&store);
        let stray = Entity::from(MenuSection::new(Uuid::now_v7(), "Stray"));
        let result = resolver.resolve_owning_restaurant(&stray).await;
        assert!(matches!(result, Err(CatalogError::ContractViolation(_))));
    }
}
