//! Error types for the catalog core.
//!
//! Validation failures carry a field-to-messages map so the request layer can
//! render field-level feedback. Store failures and contract violations are the
//! only variants callers should log as exceptional.

use serde::Serialize;
use std::{collections::BTreeMap, fmt};
use thiserror::Error;
use utoipa::ToSchema;

use super::entity::EntityKind;

/// Field-to-messages map returned for rejected saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a map holding one message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Appends every message of `other`.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for `field`, empty when there are none.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.errors.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded.
    ///
    /// # Errors
    /// Returns `self` when at least one message was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// The sibling set a slug must be unique within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessScope {
    /// Restaurant slugs are unique across all restaurants.
    Global,
    /// Menu slugs within one restaurant.
    Restaurant,
    /// Section slugs within one menu.
    Menu,
    /// Item slugs within one section.
    MenuSection,
}

impl UniquenessScope {
    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Restaurant => Self::Global,
            EntityKind::Menu => Self::Restaurant,
            EntityKind::MenuSection => Self::Menu,
            EntityKind::MenuItem => Self::MenuSection,
        }
    }

    /// Name of the parent the collision happened under.
    #[must_use]
    pub const fn label(self) -> Option<&'static str> {
        match self {
            Self::Global => None,
            Self::Restaurant => Some("restaurant"),
            Self::Menu => Some("menu"),
            Self::MenuSection => Some("menu section"),
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Global => "This restaurant name is already in use.",
            Self::Restaurant => {
                "This name is too similar to one of this restaurant's existing menu names."
            }
            Self::Menu => "This name is too similar to one of this menu's existing section names.",
            Self::MenuSection => {
                "This name is too similar to one of this menu section's existing item names."
            }
        }
    }
}

/// A slug collided with a sibling under the same parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", .scope.message())]
pub struct ConflictError {
    pub scope: UniquenessScope,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("parent {0} does not exist")]
    ParentMissing(EntityKind),
    #[error("{0} does not exist")]
    Missing(EntityKind),
    #[error("user does not exist")]
    UnknownUser,
    #[error("a restaurant must keep at least one administrator")]
    LastAdmin,
    #[error("session lifetime out of range")]
    SessionTtlOutOfRange,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("authentication required")]
    Unauthenticated,
    #[error("permission denied")]
    PermissionDenied,
    #[error("{0} not found")]
    NotFound(EntityKind),
    /// Programmer error: a call site broke the catalog contract.
    #[error("contract violation: {0}")]
    ContractViolation(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
