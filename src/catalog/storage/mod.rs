//! Entity hierarchy store.
//!
//! The catalog talks to persistence through the `CatalogStore` and `UserStore`
//! ports so the same service runs against Postgres in production and against
//! `MemoryStore` in tests and demos.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

use super::{
    entity::{Entity, EntityKind},
    error::StoreError,
};
use crate::accounts::User;

pub mod memory;
pub mod postgres;

/// Longest session lifetime a store accepts (ten years).
pub const MAX_SESSION_TTL_SECS: u64 = 315_360_000;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence for restaurants, menus, sections and items.
///
/// `parent` arguments are `None` for restaurants and the id of the immediate
/// parent for every other kind.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Inserts a new record.
    ///
    /// Fails with `UniqueViolation` when a sibling already holds the slug and
    /// with `ParentMissing` when the parent is gone.
    async fn create(&self, entity: &Entity) -> Result<(), StoreError>;

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>, StoreError>;

    /// Siblings of `kind` under `parent` whose stored slug equals `slug`.
    async fn find_by_slug(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
        slug: &str,
    ) -> Result<Vec<Entity>, StoreError>;

    /// Restaurants and menus come back ordered by name, sections and items in
    /// creation order.
    async fn list(
        &self,
        kind: EntityKind,
        parent: Option<Uuid>,
    ) -> Result<Vec<Entity>, StoreError>;

    /// Persists name, slug and kind specific attributes. Admin membership is
    /// only changed through `add_admin` / `remove_admin`.
    async fn update(&self, entity: &Entity) -> Result<(), StoreError>;

    /// Deletes the record and every descendant. Returns `false` if nothing matched.
    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<bool, StoreError>;

    async fn add_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    /// Revokes membership. Returns `false` if `user_id` was not an admin and
    /// fails with `LastAdmin` instead of leaving the restaurant without one.
    async fn remove_admin(&self, restaurant_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Persistence for users and their session tokens.
///
/// Sessions are keyed by the SHA-256 hash of the token, never the token itself.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UniqueViolation` on a taken username or email.
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Case-insensitive match on the email address.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `SessionTtlOutOfRange` when `ttl` exceeds
    /// `MAX_SESSION_TTL_SECS`.
    async fn create_session(
        &self,
        token_hash: &[u8],
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Owner of an unexpired session.
    async fn find_session_user(&self, token_hash: &[u8]) -> Result<Option<User>, StoreError>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<bool, StoreError>;
}

pub trait Store: CatalogStore + UserStore {}

impl<T: CatalogStore + UserStore> Store for T {}

pub type SharedStore = Arc<dyn Store>;
