//! Restaurant menu catalog.
//!
//! The hierarchy is `Restaurant -> Menu -> MenuSection -> MenuItem`. Every
//! record is addressed by a slug derived from its name, unique among its
//! siblings, and mutable only by the administrators of the owning restaurant.

pub mod entity;
pub mod error;
pub mod permission;
pub mod service;
pub mod slug;
pub mod storage;
pub mod validation;

#[cfg(test)]
mod tests;

pub use entity::{Entity, EntityKind, Menu, MenuItem, MenuSection, Restaurant, Theme};
pub use error::{CatalogError, ConflictError, StoreError, UniquenessScope, ValidationErrors};
pub use permission::{Access, Actor, PermissionResolver, Principal};
pub use service::{Catalog, ItemChanges, MenuChanges};
pub use slug::slugify;
pub use storage::{CatalogStore, MemoryStore, PgStore, SharedStore, Store, UserStore};

pub const NAME_MAX_CHARS: usize = 128;
pub const DESCRIPTION_MAX_CHARS: usize = 1024;

/// Restaurant slugs that would shadow a static route.
pub const RESERVED_KEYWORDS: &[&str] = &[
    "add-new-restaurant",
    "admin",
    "api",
    "health",
    "login",
    "logout",
    "register",
    "static",
    "media",
    "swagger-ui",
    "users",
    "v1",
];
