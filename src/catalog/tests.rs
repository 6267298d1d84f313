use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::{
    Actor, Catalog, CatalogError, CatalogStore, Entity, EntityKind, ItemChanges, MemoryStore,
    MenuChanges, Principal, SharedStore, StoreError, Theme, UserStore,
    validation::{FIELD_NAME, FIELD_THEME, MSG_RESERVED},
};
use crate::accounts::User;

struct Fixture {
    catalog: Catalog,
    store: SharedStore,
}

impl Fixture {
    fn new() -> Self {
        let store: SharedStore = Arc::new(MemoryStore::new());
        Self {
            catalog: Catalog::new(store.clone()),
            store,
        }
    }

    async fn user(&self, username: &str) -> Result<Actor> {
        self.actor(User::new(username, &format!("{username}@example.com")))
            .await
    }

    async fn staff(&self, username: &str) -> Result<Actor> {
        let mut user = User::new(username, &format!("{username}@example.com"));
        user.is_staff = true;
        self.actor(user).await
    }

    async fn actor(&self, user: User) -> Result<Actor> {
        self.store.create_user(&user).await?;
        Ok(Actor::User(Principal::from(user)))
    }
}

fn name_errors(err: &CatalogError) -> Vec<String> {
    match err {
        CatalogError::Validation(errors) => errors.field(FIELD_NAME).to_vec(),
        _ => Vec::new(),
    }
}

#[tokio::test]
async fn pizza_place_hierarchy() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;

    let restaurant = fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    assert_eq!(restaurant.slug, "pizza-place");

    let menu = fx
        .catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;
    assert_eq!(menu.slug, "lunch");

    let section = fx
        .catalog
        .create_section(&owner, "pizza-place", "lunch", "Pizzas")
        .await?;
    assert_eq!(section.slug, "pizzas");

    let item = fx
        .catalog
        .create_item(
            &owner,
            "pizza-place",
            "lunch",
            "pizzas",
            "Margherita",
            "Tomato, mozzarella, basil",
        )
        .await?;
    assert_eq!(item.slug, "margherita");

    let found = fx
        .catalog
        .item("pizza-place", "lunch", "pizzas", "margherita")
        .await?;
    assert_eq!(found, item);
    Ok(())
}

#[tokio::test]
async fn sibling_names_conflict_cousins_do_not() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog.create_restaurant(&owner, "Taco Stand").await?;

    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;
    fx.catalog
        .create_menu(&owner, "taco-stand", "Lunch", Some("secondary"))
        .await?;

    let err = fx
        .catalog
        .create_menu(&owner, "pizza-place", "LUNCH!", None)
        .await
        .err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(
        errors,
        ["This name is too similar to one of this restaurant's existing menu names."]
    );

    let err = fx.catalog.create_restaurant(&owner, "pizza   place").await.err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(errors, ["This restaurant name is already in use."]);
    Ok(())
}

#[tokio::test]
async fn duplicate_item_uses_section_scope() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Dinner", None)
        .await?;
    fx.catalog
        .create_section(&owner, "pizza-place", "dinner", "Pizzas")
        .await?;
    fx.catalog
        .create_section(&owner, "pizza-place", "dinner", "Salads")
        .await?;
    fx.catalog
        .create_item(&owner, "pizza-place", "dinner", "pizzas", "Funghi", "Mushrooms")
        .await?;

    // Same name in another section is fine.
    fx.catalog
        .create_item(&owner, "pizza-place", "dinner", "salads", "Funghi", "Mushrooms")
        .await?;

    let err = fx
        .catalog
        .create_item(&owner, "pizza-place", "dinner", "pizzas", "funghi", "Again")
        .await
        .err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(
        errors,
        ["This name is too similar to one of this menu section's existing item names."]
    );
    Ok(())
}

#[tokio::test]
async fn reserved_restaurant_names_rejected_even_for_staff() -> Result<()> {
    let fx = Fixture::new();
    let staff = fx.staff("root").await?;

    let err = fx.catalog.create_restaurant(&staff, "Admin").await.err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(errors, [MSG_RESERVED]);

    // Reserved words only apply to restaurants.
    fx.catalog.create_restaurant(&staff, "Pizza Place").await?;
    let menu = fx
        .catalog
        .create_menu(&staff, "pizza-place", "Admin", None)
        .await?;
    assert_eq!(menu.slug, "admin");
    Ok(())
}

#[tokio::test]
async fn saving_unchanged_entity_is_not_a_conflict() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;

    let menu = fx
        .catalog
        .update_menu(
            &owner,
            "pizza-place",
            "lunch",
            MenuChanges {
                name: None,
                theme: Some("secondary".to_string()),
            },
        )
        .await?;
    assert_eq!(menu.slug, "lunch");
    assert_eq!(menu.theme, Theme::Secondary);
    Ok(())
}

#[tokio::test]
async fn rename_moves_slug_and_detects_conflicts() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Dinner", None)
        .await?;

    let err = fx
        .catalog
        .update_menu(
            &owner,
            "pizza-place",
            "dinner",
            MenuChanges {
                name: Some("Lunch".to_string()),
                theme: None,
            },
        )
        .await
        .err();
    assert_eq!(err.as_ref().map(name_errors).map(|e| e.len()), Some(1));

    let renamed = fx
        .catalog
        .update_menu(
            &owner,
            "pizza-place",
            "dinner",
            MenuChanges {
                name: Some("Late Dinner".to_string()),
                theme: None,
            },
        )
        .await?;
    assert_eq!(renamed.slug, "late-dinner");

    let missing = fx.catalog.menu("pizza-place", "dinner").await.err();
    assert!(matches!(
        missing,
        Some(CatalogError::NotFound(EntityKind::Menu))
    ));
    Ok(())
}

#[tokio::test]
async fn field_rules_are_reported_per_field() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;
    fx.catalog
        .create_section(&owner, "pizza-place", "lunch", "Pizzas")
        .await?;

    let err = fx
        .catalog
        .create_item(&owner, "pizza-place", "lunch", "pizzas", "   ", "")
        .await
        .err();
    match err {
        Some(CatalogError::Validation(errors)) => {
            assert!(!errors.field("name").is_empty());
            assert!(!errors.field("description").is_empty());
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = fx
        .catalog
        .update_item(
            &owner,
            "pizza-place",
            "lunch",
            "pizzas",
            "missing",
            ItemChanges::default(),
        )
        .await
        .err();
    assert!(matches!(
        err,
        Some(CatalogError::NotFound(EntityKind::MenuItem))
    ));
    Ok(())
}

#[tokio::test]
async fn mutations_require_restaurant_admin() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    let stranger = fx.user("stranger").await?;
    let staff = fx.staff("root").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;

    let err = fx
        .catalog
        .create_section(&stranger, "pizza-place", "lunch", "Pizzas")
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::PermissionDenied)));

    let err = fx
        .catalog
        .create_section(&Actor::Anonymous, "pizza-place", "lunch", "Pizzas")
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::Unauthenticated)));

    let err = fx
        .catalog
        .create_restaurant(&Actor::Anonymous, "Anon Eats")
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::Unauthenticated)));

    // Staff may mutate anything.
    fx.catalog
        .create_section(&staff, "pizza-place", "lunch", "Pizzas")
        .await?;

    // Reads stay public.
    assert_eq!(fx.catalog.list_sections("pizza-place", "lunch").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_path_segments_are_not_found() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;

    let err = fx.catalog.list_menus("nowhere").await.err();
    assert!(matches!(
        err,
        Some(CatalogError::NotFound(EntityKind::Restaurant))
    ));

    let err = fx
        .catalog
        .create_section(&owner, "pizza-place", "brunch", "Eggs")
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::NotFound(EntityKind::Menu))));
    Ok(())
}

#[tokio::test]
async fn deleting_a_restaurant_cascades() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;
    fx.catalog
        .create_section(&owner, "pizza-place", "lunch", "Pizzas")
        .await?;
    let item = fx
        .catalog
        .create_item(&owner, "pizza-place", "lunch", "pizzas", "Margherita", "Classic")
        .await?;

    fx.catalog.delete_restaurant(&owner, "pizza-place").await?;

    assert!(fx.catalog.list_restaurants().await?.is_empty());
    assert!(fx.store.get(EntityKind::MenuItem, item.id).await?.is_none());

    // The slug is free again.
    let again = fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    assert_eq!(again.slug, "pizza-place");
    Ok(())
}

#[tokio::test]
async fn admin_membership_changes() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    let partner = fx.user("partner").await?;
    let restaurant = fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    let owner_id = owner.principal().map(|p| p.user_id);
    let partner_id = partner.principal().map(|p| p.user_id);

    let err = fx
        .catalog
        .add_restaurant_admin(&partner, "pizza-place", "partner")
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::PermissionDenied)));

    let err = fx
        .catalog
        .add_restaurant_admin(&owner, "pizza-place", "ghost")
        .await
        .err();
    match err {
        Some(CatalogError::Validation(errors)) => {
            assert_eq!(errors.field("username").len(), 1);
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let updated = fx
        .catalog
        .add_restaurant_admin(&owner, "pizza-place", "partner")
        .await?;
    assert_eq!(updated.admin_users.len(), 2);

    // The partner can now edit the restaurant.
    fx.catalog
        .create_menu(&partner, "pizza-place", "Brunch", None)
        .await?;

    if let Some(owner_id) = owner_id {
        let updated = fx
            .catalog
            .remove_restaurant_admin(&partner, "pizza-place", owner_id)
            .await?;
        assert_eq!(updated.admin_users.len(), 1);
        assert!(!updated.is_admin(owner_id));
    }

    if let Some(partner_id) = partner_id {
        let err = fx
            .catalog
            .remove_restaurant_admin(&partner, "pizza-place", partner_id)
            .await
            .err();
        match err {
            Some(CatalogError::Validation(errors)) => {
                assert_eq!(
                    errors.field("user_id"),
                    ["A restaurant must keep at least one administrator."]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    let err = fx
        .catalog
        .create_menu(&owner, "pizza-place", "Supper", None)
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::PermissionDenied)));
    assert_eq!(restaurant.id, updated.id);
    Ok(())
}

#[tokio::test]
async fn listings_follow_store_ordering() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Zucchini Bar").await?;
    fx.catalog.create_restaurant(&owner, "Apple Cafe").await?;
    fx.catalog
        .create_menu(&owner, "apple-cafe", "Lunch", None)
        .await?;
    fx.catalog
        .create_section(&owner, "apple-cafe", "lunch", "Soups")
        .await?;
    fx.catalog
        .create_section(&owner, "apple-cafe", "lunch", "Bread")
        .await?;

    let names: Vec<String> = fx
        .catalog
        .list_restaurants()
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["Apple Cafe", "Zucchini Bar"]);

    // Sections keep creation order.
    let sections: Vec<String> = fx
        .catalog
        .list_sections("apple-cafe", "lunch")
        .await?
        .into_iter()
        .map(|s| s.slug)
        .collect();
    assert_eq!(sections, ["soups", "bread"]);
    Ok(())
}

#[tokio::test]
async fn pizza_place_scenario() -> Result<()> {
    let fx = Fixture::new();
    let admin = fx.user("admin").await?;
    let outsider = fx.user("outsider").await?;
    let staff = fx.staff("staff").await?;
    fx.catalog.create_restaurant(&admin, "Pizza Place").await?;

    let err = fx
        .catalog
        .create_menu(&outsider, "pizza-place", "Lunch", None)
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::PermissionDenied)));

    let lunch = fx
        .catalog
        .create_menu(&admin, "pizza-place", "Lunch", None)
        .await?;
    assert_eq!(lunch.slug, "lunch");

    let err = fx
        .catalog
        .create_menu(&admin, "pizza-place", "Lunch", None)
        .await
        .err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(errors.len(), 1);
    assert!(errors.iter().all(|message| message.contains("restaurant")));

    let err = fx
        .catalog
        .create_restaurant(&staff, "add new restaurant")
        .await
        .err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(errors, [MSG_RESERVED]);

    fx.catalog.delete_restaurant(&admin, "pizza-place").await?;
    assert!(fx.store.get(EntityKind::Menu, lunch.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_theme_is_a_field_error() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;

    let err = fx
        .catalog
        .create_menu(&owner, "pizza-place", "", Some("neon"))
        .await
        .err();
    match err {
        Some(CatalogError::Validation(errors)) => {
            assert_eq!(
                errors.field(FIELD_THEME),
                ["Select a valid choice. neon is not one of the available choices."]
            );
            assert_eq!(errors.field(FIELD_NAME), ["This field is required."]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(fx.catalog.list_menus("pizza-place").await?.is_empty());

    // Permission checks run before the theme is looked at.
    let err = fx
        .catalog
        .create_menu(&Actor::Anonymous, "pizza-place", "Lunch", Some("neon"))
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::Unauthenticated)));

    fx.catalog
        .create_menu(&owner, "pizza-place", "Lunch", Some("secondary"))
        .await?;
    let err = fx
        .catalog
        .update_menu(
            &owner,
            "pizza-place",
            "lunch",
            MenuChanges {
                name: Some("Brunch".to_string()),
                theme: Some("neon".to_string()),
            },
        )
        .await
        .err();
    assert!(matches!(err, Some(CatalogError::Validation(_))));

    let menu = fx.catalog.menu("pizza-place", "lunch").await?;
    assert_eq!(menu.theme, Theme::Secondary);
    Ok(())
}

/// Memory store whose menu slug lookups come back empty, so a duplicate is only
/// caught by the store's own constraint at write time.
#[derive(Default)]
struct StaleMenuLookups(MemoryStore);

#[async_trait]
impl CatalogStore for StaleMenuLookups {
    async fn ping(&self) -> Result<(), StoreError> {
        self.0.ping().await
    }

    async fn create(&self, entity: &Entity) -> Result<(), StoreError> {
        self.0.create(entity).await
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StoreError> {
        self.0.get(kind, id).await
    }

    async fn find_by_slug(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
        slug: &str,
    ) -> Result<Vec<Entity>, StoreError> {
        if kind == EntityKind::Menu {
            return Ok(Vec::new());
        }
        self.0.find_by_slug(kind, parent, slug).await
    }

    async fn list(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
    ) -> Result<Vec<Entity>, StoreError> {
        self.0.list(kind, parent).await
    }

    async fn update(&self, entity: &Entity) -> Result<(), StoreError> {
        self.0.update(entity).await
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError> {
        self.0.delete(kind, id).await
    }

    async fn add_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.0.add_admin(restaurant_id, user_id).await
    }

    async fn remove_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        self.0.remove_admin(restaurant_id, user_id).await
    }
}

#[async_trait]
impl UserStore for StaleMenuLookups {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.0.create_user(user).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.0.get_user(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.0.find_user_by_username(username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.0.find_user_by_email(email).await
    }

    async fn create_session(
        &self,
        token_hash: &[u8],
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.0.create_session(token_hash, user_id, ttl).await
    }

    async fn find_session_user(&self, token_hash: &[u8]) -> Result<Option<User>, StoreError> {
        self.0.find_session_user(token_hash).await
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError> {
        self.0.delete_session(token_hash).await
    }
}

#[tokio::test]
async fn write_time_unique_violation_reports_scoped_conflict() -> Result<()> {
    let store: SharedStore = Arc::new(StaleMenuLookups::default());
    let catalog = Catalog::new(store.clone());
    let owner = User::new("owner", "owner@example.com");
    store.create_user(&owner).await?;
    let owner = Actor::User(Principal::from(owner));

    catalog.create_restaurant(&owner, "Pizza Place").await?;
    catalog
        .create_menu(&owner, "pizza-place", "Lunch", None)
        .await?;

    let err = catalog
        .create_menu(&owner, "pizza-place", "LUNCH", None)
        .await
        .err();
    let errors = err.as_ref().map(name_errors).unwrap_or_default();
    assert_eq!(
        errors,
        ["This name is too similar to one of this restaurant's existing menu names."]
    );
    assert_eq!(catalog.list_menus("pizza-place").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn last_admin_is_kept_under_concurrent_removal() -> Result<()> {
    let fx = Fixture::new();
    let owner = fx.user("owner").await?;
    let partner = fx.user("partner").await?;
    fx.catalog.create_restaurant(&owner, "Pizza Place").await?;
    fx.catalog
        .add_restaurant_admin(&owner, "pizza-place", "partner")
        .await?;

    let (Some(owner_id), Some(partner_id)) = (
        owner.principal().map(|p| p.user_id),
        partner.principal().map(|p| p.user_id),
    ) else {
        panic!("fixture actors are signed in");
    };

    let (first, second) = tokio::join!(
        fx.catalog
            .remove_restaurant_admin(&owner, "pizza-place", partner_id),
        fx.catalog
            .remove_restaurant_admin(&partner, "pizza-place", owner_id),
    );
    assert_eq!(
        usize::from(first.is_ok()) + usize::from(second.is_ok()),
        1,
        "exactly one removal should win"
    );

    let restaurant = fx.catalog.restaurant("pizza-place").await?;
    assert_eq!(restaurant.admin_users.len(), 1);
    Ok(())
}
