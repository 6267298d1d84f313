//! HTTP handlers.
//!
//! Handlers resolve the caller from the session token, delegate to `Catalog`
//! or `Accounts`, and map domain errors through `ApiError`.

pub mod error;
pub mod health;
pub mod items;
pub mod menus;
pub mod restaurants;
pub mod root;
pub mod sections;
pub mod session;
pub mod types;

pub use error::ApiError;
