//! Request and response DTOs for the HTTP API.
//!
//! Required text fields default to empty so a missing field is reported by
//! validation ("This field is required.") instead of a JSON rejection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    accounts::User,
    catalog::{Menu, MenuItem, MenuSection, Restaurant, Theme},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Opaque session token; send it back as `Authorization: Bearer <token>`.
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddAdminRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestaurantResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub admin_users: Vec<Uuid>,
}

impl From<Restaurant> for RestaurantResponse {
    fn from(restaurant: Restaurant) -> Self {
        Self {
            id: restaurant.id,
            name: restaurant.name,
            slug: restaurant.slug,
            admin_users: restaurant.admin_users.into_iter().collect(),
        }
    }
}

/// `theme` is taken as text so an unknown choice comes back as a field error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuRequest {
    #[serde(default)]
    pub name: String,
    /// `default` or `secondary`; omitted means `default`.
    #[schema(example = "secondary")]
    pub theme: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMenuRequest {
    pub name: Option<String>,
    #[schema(example = "default")]
    pub theme: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MenuResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub slug: String,
    pub theme: Theme,
}

impl From<Menu> for MenuResponse {
    fn from(menu: Menu) -> Self {
        Self {
            id: menu.id,
            restaurant_id: menu.restaurant_id,
            name: menu.name,
            slug: menu.slug,
            theme: menu.theme,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSectionRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSectionRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionResponse {
    pub id: Uuid,
    pub menu_id: Uuid,
    pub name: String,
    pub slug: String,
}

impl From<MenuSection> for SectionResponse {
    fn from(section: MenuSection) -> Self {
        Self {
            id: section.id,
            menu_id: section.menu_id,
            name: section.name,
            slug: section.slug,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub section_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl From<MenuItem> for ItemResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            section_id: item.section_id,
            name: item.name,
            slug: item.slug,
            description: item.description,
        }
    }
}

/// Converts a list of domain records into response DTOs.
pub(super) fn responses<T, R: From<T>>(records: Vec<T>) -> Vec<R> {
    records.into_iter().map(R::from).collect()
}
