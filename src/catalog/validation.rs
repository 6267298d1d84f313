//! Pure validation run on every save, before anything touches the store.
//!
//! Field rules mirror the column constraints (required, max length) and the
//! reserved restaurant slugs. Scoped uniqueness is checked against the sibling
//! records the caller fetched with `CatalogStore::find_by_slug`.

use uuid::Uuid;

use super::{
    DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS, RESERVED_KEYWORDS,
    entity::{Entity, Theme},
    error::{ConflictError, UniquenessScope, ValidationErrors},
};

pub const FIELD_NAME: &str = "name";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_THEME: &str = "theme";

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_RESERVED: &str = "This name is reserved and cannot be used. Please choose another name.";
pub const MSG_EMPTY_SLUG: &str = "Enter a name containing at least one letter or number.";

/// Returns `true` when `slug` collides with a static route segment.
#[must_use]
pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_KEYWORDS.contains(&slug)
}

/// Checks required fields, lengths and reserved slugs for `entity`.
///
/// Expects the slug to be fresh (see `Entity::refresh_slug`).
///
/// # Errors
/// Returns every field message that applies.
pub fn validate_fields(entity: &Entity) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = entity.name();
    if name.trim().is_empty() {
        errors.add(FIELD_NAME, MSG_REQUIRED);
    } else if let Some(message) = too_long(name, NAME_MAX_CHARS) {
        errors.add(FIELD_NAME, message);
    } else if entity.slug().is_empty() {
        errors.add(FIELD_NAME, MSG_EMPTY_SLUG);
    }

    match entity {
        Entity::Restaurant(restaurant) if is_reserved_slug(&restaurant.slug) => {
            errors.add(FIELD_NAME, MSG_RESERVED);
        }
        Entity::MenuItem(item) => {
            if item.description.trim().is_empty() {
                errors.add(FIELD_DESCRIPTION, MSG_REQUIRED);
            } else if let Some(message) = too_long(&item.description, DESCRIPTION_MAX_CHARS) {
                errors.add(FIELD_DESCRIPTION, message);
            }
        }
        _ => {}
    }

    errors.into_result()
}

/// Parses a submitted menu theme.
///
/// # Errors
/// Returns a `theme` field message for values outside the theme choices.
pub fn parse_theme(value: &str) -> Result<Theme, ValidationErrors> {
    value.parse::<Theme>().map_err(|_| {
        ValidationErrors::single(
            FIELD_THEME,
            format!("Select a valid choice. {value} is not one of the available choices."),
        )
    })
}

/// Scoped uniqueness check.
///
/// `matches` are the siblings of the same kind under the same parent whose
/// stored slug equals `candidate_slug`. The save is allowed when there are none,
/// or when every match is the record being saved (`self_reference`). On first
/// creation `self_reference` is `None`, so any match conflicts.
///
/// # Errors
/// Returns a `ConflictError` naming the parent scope.
pub fn validate_unique(
    scope: UniquenessScope,
    candidate_slug: &str,
    self_reference: Option<Uuid>,
    matches: &[Entity],
) -> Result<(), ConflictError> {
    let collides = matches
        .iter()
        .filter(|sibling| sibling.slug() == candidate_slug)
        .any(|sibling| Some(sibling.id()) != self_reference);

    if collides {
        Err(ConflictError { scope })
    } else {
        Ok(())
    }
}

fn too_long(value: &str, max: usize) -> Option<String> {
    let count = value.chars().count();
    (count > max)
        .then(|| format!("Ensure this value has at most {max} characters (it has {count})."))
}

impl From<ConflictError> for ValidationErrors {
    fn from(conflict: ConflictError) -> Self {
        Self::single(FIELD_NAME, conflict.to_string())
    }
}
