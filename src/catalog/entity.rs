//! The four catalog entity kinds and the closed `Entity` variant over them.
//!
//! Restaurant is the root; every other kind stores the id of its immediate
//! parent. Slugs are derived from names, see [`Entity::refresh_slug`].

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

use super::slug::slugify;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Restaurant,
    Menu,
    MenuSection,
    MenuItem,
}

impl EntityKind {
    /// Human readable name used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Menu => "menu",
            Self::MenuSection => "menu section",
            Self::MenuItem => "menu item",
        }
    }

    /// Kind of the immediate parent, `None` for the root.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Restaurant => None,
            Self::Menu => Some(Self::Restaurant),
            Self::MenuSection => Some(Self::Menu),
            Self::MenuItem => Some(Self::MenuSection),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Secondary,
}

impl Theme {
    /// Canonical value stored in the `menus.theme` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Secondary => "secondary",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "secondary" => Ok(Self::Secondary),
            other => Err(format!("unknown menu theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub admin_users: BTreeSet<Uuid>,
}

impl Restaurant {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            slug: slugify(name),
            admin_users: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn is_admin(&self, user_id: Uuid) -> bool {
        self.admin_users.contains(&user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub slug: String,
    pub theme: Theme,
}

impl Menu {
    #[must_use]
    pub fn new(restaurant_id: Uuid, name: &str, theme: Theme) -> Self {
        Self {
            id: Uuid::now_v7(),
            restaurant_id,
            name: name.to_string(),
            slug: slugify(name),
            theme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSection {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub name: String,
    pub slug: String,
}

impl MenuSection {
    #[must_use]
    pub fn new(menu_id: Uuid, name: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            menu_id,
            name: name.to_string(),
            slug: slugify(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: Uuid,
    pub section_id: Uuid,
    pub name: String,
    pub description: String,
    pub slug: String,
}

impl MenuItem {
    #[must_use]
    pub fn new(section_id: Uuid, name: &str, description: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            section_id,
            name: name.to_string(),
            description: description.to_string(),
            slug: slugify(name),
        }
    }
}

/// Any catalog record. Permission checks and the store operate on this closed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Restaurant(Restaurant),
    Menu(Menu),
    MenuSection(MenuSection),
    MenuItem(MenuItem),
}

impl Entity {
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Restaurant(_) => EntityKind::Restaurant,
            Self::Menu(_) => EntityKind::Menu,
            Self::MenuSection(_) => EntityKind::MenuSection,
            Self::MenuItem(_) => EntityKind::MenuItem,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Restaurant(restaurant) => restaurant.id,
            Self::Menu(menu) => menu.id,
            Self::MenuSection(section) => section.id,
            Self::MenuItem(item) => item.id,
        }
    }

    /// Id of the immediate parent; the uniqueness scope of the slug.
    #[must_use]
    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            Self::Restaurant(_) => None,
            Self::Menu(menu) => Some(menu.restaurant_id),
            Self::MenuSection(section) => Some(section.menu_id),
            Self::MenuItem(item) => Some(item.section_id),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Restaurant(restaurant) => &restaurant.name,
            Self::Menu(menu) => &menu.name,
            Self::MenuSection(section) => &section.name,
            Self::MenuItem(item) => &item.name,
        }
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Restaurant(restaurant) => &restaurant.slug,
            Self::Menu(menu) => &menu.slug,
            Self::MenuSection(section) => &section.slug,
            Self::MenuItem(item) => &item.slug,
        }
    }

    fn slug_mut(&mut self) -> &mut String {
        match self {
            Self::Restaurant(restaurant) => &mut restaurant.slug,
            Self::Menu(menu) => &mut menu.slug,
            Self::MenuSection(section) => &mut section.slug,
            Self::MenuItem(item) => &mut item.slug,
        }
    }

    /// Recomputes the slug from the name when they disagree.
    /// Returns `true` if the stored slug changed.
    pub fn refresh_slug(&mut self) -> bool {
        let derived = slugify(self.name());
        if self.slug() == derived {
            return false;
        }
        *self.slug_mut() = derived;
        true
    }
}

macro_rules! entity_variant {
    ($variant:ident) => {
        impl From<$variant> for Entity {
            fn from(value: $variant) -> Self {
                Self::$variant(value)
            }
        }

        impl TryFrom<Entity> for $variant {
            type Error = Entity;

            fn try_from(entity: Entity) -> Result<Self, Self::Error> {
                match entity {
                    Entity::$variant(value) => Ok(value),
                    other => Err(other),
                }
            }
        }
    };
}

entity_variant!(Restaurant);
entity_variant!(Menu);
entity_variant!(MenuSection);
entity_variant!(MenuItem);
