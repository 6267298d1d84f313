//! # Menus
//!
//! `menus` publishes restaurant menus for many tenants. Content forms a strict
//! hierarchy:
//!
//! ```text
//! Restaurant -> Menu -> MenuSection -> MenuItem
//! ```
//!
//! Every entity carries a URL slug derived from its name. Slugs are unique
//! among siblings only, so two restaurants may both have a "Lunch" menu while
//! a single restaurant may not.
//!
//! ## Permissions
//!
//! Reads are public. Mutations require a session and either staff status or
//! membership in the admin set of the restaurant that owns the target. The
//! owning restaurant is found by walking parent links upward.
//!
//! ## Storage
//!
//! `catalog::storage` provides a `PostgreSQL` store (`sql/schema.sql`) and an
//! in-memory store for local runs and tests. Both enforce sibling slug
//! uniqueness and cascade deletes down the hierarchy.

pub mod accounts;
pub mod api;
pub mod catalog;
pub mod cli;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
