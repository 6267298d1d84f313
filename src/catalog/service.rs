//! Catalog service: slug path lookups and the guarded save path.
//!
//! Every mutation runs the same sequence: resolve the slug path, authorize the
//! actor against the owning restaurant, refresh the slug, validate fields and
//! scoped uniqueness, then write. A unique-constraint failure at write time is
//! reported exactly like the application-level conflict.

use tracing::{debug, info};
use uuid::Uuid;

use super::{
    entity::{Entity, EntityKind, Menu, MenuItem, MenuSection, Restaurant, Theme},
    error::{CatalogError, ConflictError, StoreError, UniquenessScope, ValidationErrors},
    permission::{Access, Actor, PermissionResolver},
    storage::{CatalogStore, SharedStore, Store, UserStore},
    validation::{parse_theme, validate_fields, validate_unique},
};

pub const FIELD_USERNAME: &str = "username";
pub const FIELD_USER_ID: &str = "user_id";

const MSG_UNKNOWN_USER: &str = "Select a valid user. That user does not exist.";
const MSG_NOT_AN_ADMIN: &str = "This user is not an administrator of this restaurant.";
const MSG_LAST_ADMIN: &str = "A restaurant must keep at least one administrator.";

/// Partial update for a menu. `theme` is the submitted choice, checked on save.
#[derive(Debug, Clone, Default)]
pub struct MenuChanges {
    pub name: Option<String>,
    pub theme: Option<String>,
}

/// Partial update for a menu item.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct Catalog {
    store: SharedStore,
}

impl Catalog {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    fn resolver(&self) -> PermissionResolver<'_, dyn Store> {
        PermissionResolver::new(self.store.as_ref())
    }

    // Reads are public and never consult the permission gate.

    /// # Errors
    /// Store failures.
    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>, CatalogError> {
        self.list_typed(EntityKind::Restaurant, None).await
    }

    /// # Errors
    /// `NotFound` when the slug does not resolve.
    pub async fn restaurant(&self, restaurant: &str) -> Result<Restaurant, CatalogError> {
        self.lookup(EntityKind::Restaurant, None, restaurant).await
    }

    /// # Errors
    /// `NotFound` when the restaurant does not resolve.
    pub async fn list_menus(&self, restaurant: &str) -> Result<Vec<Menu>, CatalogError> {
        let restaurant = self.restaurant(restaurant).await?;
        self.list_typed(EntityKind::Menu, Some(restaurant.id)).await
    }

    /// # Errors
    /// `NotFound` at the first path segment that does not resolve.
    pub async fn menu(&self, restaurant: &str, menu: &str) -> Result<Menu, CatalogError> {
        let restaurant = self.restaurant(restaurant).await?;
        self.lookup(EntityKind::Menu, Some(restaurant.id), menu).await
    }

    /// # Errors
    /// `NotFound` at the first path segment that does not resolve.
    pub async fn list_sections(
        &self,
        restaurant: &str,
        menu: &str,
    ) -> Result<Vec<MenuSection>, CatalogError> {
        let menu = self.menu(restaurant, menu).await?;
        self.list_typed(EntityKind::MenuSection, Some(menu.id)).await
    }

    /// # Errors
    /// `NotFound` at the first path segment that does not resolve.
    pub async fn section(
        &self,
        restaurant: &str,
        menu: &str,
        section: &str,
    ) -> Result<MenuSection, CatalogError> {
        let menu = self.menu(restaurant, menu).await?;
        self.lookup(EntityKind::MenuSection, Some(menu.id), section)
            .await
    }

    /// # Errors
    /// `NotFound` at the first path segment that does not resolve.
    pub async fn list_items(
        &self,
        restaurant: &str,
        menu: &str,
        section: &str,
    ) -> Result<Vec<MenuItem>, CatalogError> {
        let section = self.section(restaurant, menu, section).await?;
        self.list_typed(EntityKind::MenuItem, Some(section.id)).await
    }

    /// # Errors
    /// `NotFound` at the first path segment that does not resolve.
    pub async fn item(
        &self,
        restaurant: &str,
        menu: &str,
        section: &str,
        item: &str,
    ) -> Result<MenuItem, CatalogError> {
        let section = self.section(restaurant, menu, section).await?;
        self.lookup(EntityKind::MenuItem, Some(section.id), item)
            .await
    }

    /// Creates a restaurant administered by its creator.
    ///
    /// # Errors
    /// `Unauthenticated` for anonymous actors, `Validation` for rejected names.
    pub async fn create_restaurant(
        &self,
        actor: &Actor,
        name: &str,
    ) -> Result<Restaurant, CatalogError> {
        let Some(principal) = actor.principal() else {
            return Err(CatalogError::Unauthenticated);
        };
        let mut restaurant = Restaurant::new(name);
        restaurant.admin_users.insert(principal.user_id);
        let saved = self.save(restaurant.into(), false).await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path, permission and validation failures.
    pub async fn update_restaurant(
        &self,
        actor: &Actor,
        restaurant: &str,
        name: Option<&str>,
    ) -> Result<Restaurant, CatalogError> {
        let mut restaurant = self.restaurant(restaurant).await?;
        self.authorize(actor, &restaurant.clone().into()).await?;
        if let Some(name) = name {
            restaurant.name = name.to_string();
        }
        let saved = self.save(restaurant.into(), true).await?;
        into_kind(saved)
    }

    /// Deletes the restaurant with all of its menus, sections and items.
    ///
    /// # Errors
    /// Path and permission failures.
    pub async fn delete_restaurant(
        &self,
        actor: &Actor,
        restaurant: &str,
    ) -> Result<(), CatalogError> {
        let restaurant = self.restaurant(restaurant).await?;
        self.remove(actor, restaurant.into()).await
    }

    /// Grants `username` admin rights on the restaurant.
    ///
    /// # Errors
    /// `Validation` on the `username` field when no such user exists.
    pub async fn add_restaurant_admin(
        &self,
        actor: &Actor,
        restaurant: &str,
        username: &str,
    ) -> Result<Restaurant, CatalogError> {
        let restaurant = self.restaurant(restaurant).await?;
        self.authorize(actor, &restaurant.clone().into()).await?;

        let Some(user) = self.store.find_user_by_username(username).await? else {
            return Err(ValidationErrors::single(FIELD_USERNAME, MSG_UNKNOWN_USER).into());
        };
        match self.store.add_admin(restaurant.id, user.id).await {
            Ok(()) => {}
            Err(StoreError::UnknownUser) => {
                return Err(ValidationErrors::single(FIELD_USERNAME, MSG_UNKNOWN_USER).into());
            }
            Err(StoreError::Missing(kind)) => return Err(CatalogError::NotFound(kind)),
            Err(err) => return Err(err.into()),
        }
        info!("Added {} as admin of restaurant {}", user.username, restaurant.slug);
        self.reload_restaurant(restaurant.id).await
    }

    /// Revokes admin rights. The last administrator cannot be removed.
    ///
    /// # Errors
    /// `Validation` on the `user_id` field for non-admins and the last admin.
    pub async fn remove_restaurant_admin(
        &self,
        actor: &Actor,
        restaurant: &str,
        user_id: Uuid,
    ) -> Result<Restaurant, CatalogError> {
        let restaurant = self.restaurant(restaurant).await?;
        self.authorize(actor, &restaurant.clone().into()).await?;

        match self.store.remove_admin(restaurant.id, user_id).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(ValidationErrors::single(FIELD_USER_ID, MSG_NOT_AN_ADMIN).into());
            }
            Err(StoreError::LastAdmin) => {
                return Err(ValidationErrors::single(FIELD_USER_ID, MSG_LAST_ADMIN).into());
            }
            Err(err) => return Err(err.into()),
        }
        info!("Removed admin {user_id} from restaurant {}", restaurant.slug);
        self.reload_restaurant(restaurant.id).await
    }

    /// Creates a menu. A missing `theme` falls back to `Theme::Default`.
    ///
    /// # Errors
    /// Path, permission and validation failures.
    pub async fn create_menu(
        &self,
        actor: &Actor,
        restaurant: &str,
        name: &str,
        theme: Option<&str>,
    ) -> Result<Menu, CatalogError> {
        let restaurant = self.restaurant(restaurant).await?;
        self.authorize(actor, &restaurant.clone().into()).await?;

        let mut errors = ValidationErrors::new();
        let theme = choose_theme(theme, &mut errors).unwrap_or_default();
        let saved = self
            .save_checked(Menu::new(restaurant.id, name, theme).into(), false, errors)
            .await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path, permission and validation failures.
    pub async fn update_menu(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        changes: MenuChanges,
    ) -> Result<Menu, CatalogError> {
        let mut menu = self.menu(restaurant, menu).await?;
        self.authorize(actor, &menu.clone().into()).await?;

        let mut errors = ValidationErrors::new();
        if let Some(name) = changes.name {
            menu.name = name;
        }
        if let Some(theme) = choose_theme(changes.theme.as_deref(), &mut errors) {
            menu.theme = theme;
        }
        let saved = self.save_checked(menu.into(), true, errors).await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path and permission failures.
    pub async fn delete_menu(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
    ) -> Result<(), CatalogError> {
        let menu = self.menu(restaurant, menu).await?;
        self.remove(actor, menu.into()).await
    }

    /// # Errors
    /// Path, permission and validation failures.
    pub async fn create_section(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        name: &str,
    ) -> Result<MenuSection, CatalogError> {
        let menu = self.menu(restaurant, menu).await?;
        self.authorize(actor, &menu.clone().into()).await?;
        let saved = self.save(MenuSection::new(menu.id, name).into(), false).await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path, permission and validation failures.
    pub async fn update_section(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        section: &str,
        name: Option<&str>,
    ) -> Result<MenuSection, CatalogError> {
        let mut section = self.section(restaurant, menu, section).await?;
        self.authorize(actor, &section.clone().into()).await?;
        if let Some(name) = name {
            section.name = name.to_string();
        }
        let saved = self.save(section.into(), true).await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path and permission failures.
    pub async fn delete_section(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        section: &str,
    ) -> Result<(), CatalogError> {
        let section = self.section(restaurant, menu, section).await?;
        self.remove(actor, section.into()).await
    }

    /// # Errors
    /// Path, permission and validation failures.
    pub async fn create_item(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        section: &str,
        name: &str,
        description: &str,
    ) -> Result<MenuItem, CatalogError> {
        let section = self.section(restaurant, menu, section).await?;
        self.authorize(actor, &section.clone().into()).await?;
        let saved = self
            .save(MenuItem::new(section.id, name, description).into(), false)
            .await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path, permission and validation failures.
    pub async fn update_item(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        section: &str,
        item: &str,
        changes: ItemChanges,
    ) -> Result<MenuItem, CatalogError> {
        let mut item = self.item(restaurant, menu, section, item).await?;
        self.authorize(actor, &item.clone().into()).await?;
        if let Some(name) = changes.name {
            item.name = name;
        }
        if let Some(description) = changes.description {
            item.description = description;
        }
        let saved = self.save(item.into(), true).await?;
        into_kind(saved)
    }

    /// # Errors
    /// Path and permission failures.
    pub async fn delete_item(
        &self,
        actor: &Actor,
        restaurant: &str,
        menu: &str,
        section: &str,
        item: &str,
    ) -> Result<(), CatalogError> {
        let item = self.item(restaurant, menu, section, item).await?;
        self.remove(actor, item.into()).await
    }

    /// Maps the permission gate onto `Unauthenticated` / `PermissionDenied`.
    async fn authorize(&self, actor: &Actor, target: &Entity) -> Result<(), CatalogError> {
        if actor.principal().is_none() {
            return Err(CatalogError::Unauthenticated);
        }
        if self
            .resolver()
            .has_object_permission(actor, Access::Mutate, Some(target))
            .await?
        {
            Ok(())
        } else {
            debug!("Denied mutation of {} {}", target.kind(), target.slug());
            Err(CatalogError::PermissionDenied)
        }
    }

    /// The save path shared by every create and update.
    async fn save(&self, entity: Entity, existing: bool) -> Result<Entity, CatalogError> {
        self.save_checked(entity, existing, ValidationErrors::new())
            .await
    }

    /// `save`, reporting `pending` field errors together with the field rules.
    async fn save_checked(
        &self,
        mut entity: Entity,
        existing: bool,
        mut errors: ValidationErrors,
    ) -> Result<Entity, CatalogError> {
        entity.refresh_slug();
        let kind = entity.kind();

        if let Err(field_errors) = validate_fields(&entity) {
            errors.merge(field_errors);
        }
        if !errors.is_empty() {
            debug!("Rejected {kind} save: {errors}");
            return Err(errors.into());
        }

        let scope = UniquenessScope::for_kind(kind);
        let matches = self
            .store
            .find_by_slug(kind, entity.parent_id(), entity.slug())
            .await?;
        let self_reference = existing.then(|| entity.id());
        if let Err(conflict) = validate_unique(scope, entity.slug(), self_reference, &matches) {
            debug!("Rejected {kind} save: {conflict}");
            return Err(ValidationErrors::from(conflict).into());
        }

        let write = if existing {
            self.store.update(&entity).await
        } else {
            self.store.create(&entity).await
        };
        match write {
            Ok(()) => {}
            Err(StoreError::UniqueViolation) => {
                debug!("Rejected {kind} save on unique constraint");
                return Err(ValidationErrors::from(ConflictError { scope }).into());
            }
            Err(StoreError::ParentMissing(parent) | StoreError::Missing(parent)) => {
                return Err(CatalogError::NotFound(parent));
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "{} {kind} {} ({})",
            if existing { "Updated" } else { "Created" },
            entity.slug(),
            entity.id()
        );
        Ok(entity)
    }

    async fn remove(&self, actor: &Actor, target: Entity) -> Result<(), CatalogError> {
        self.authorize(actor, &target).await?;
        let kind = target.kind();
        if !self.store.delete(kind, target.id()).await? {
            return Err(CatalogError::NotFound(kind));
        }
        info!("Deleted {kind} {} ({})", target.slug(), target.id());
        Ok(())
    }

    async fn reload_restaurant(&self, id: Uuid) -> Result<Restaurant, CatalogError> {
        let entity = self
            .store
            .get(EntityKind::Restaurant, id)
            .await?
            .ok_or(CatalogError::NotFound(EntityKind::Restaurant))?;
        into_kind(entity)
    }

    async fn lookup<T>(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
        slug: &str,
    ) -> Result<T, CatalogError>
    where
        T: TryFrom<Entity, Error = Entity>,
    {
        let entity = self
            .store
            .find_by_slug(kind, parent, slug)
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound(kind))?;
        into_kind(entity)
    }

    async fn list_typed<T>(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
    ) -> Result<Vec<T>, CatalogError>
    where
        T: TryFrom<Entity, Error = Entity>,
    {
        self.store
            .list(kind, parent)
            .await?
            .into_iter()
            .map(into_kind)
            .collect()
    }
}

/// Parses a submitted theme, recording a field error instead of failing.
fn choose_theme(value: Option<&str>, errors: &mut ValidationErrors) -> Option<Theme> {
    match parse_theme(value?) {
        Ok(theme) => Some(theme),
        Err(theme_errors) => {
            errors.merge(theme_errors);
            None
        }
    }
}

fn into_kind<T>(entity: Entity) -> Result<T, CatalogError>
where
    T: TryFrom<Entity, Error = Entity>,
{
    T::try_from(entity)
        .map_err(|_| CatalogError::ContractViolation("store returned the wrong entity kind"))
}
