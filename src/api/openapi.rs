use utoipa::{
    OpenApi,
    openapi::{Contact, InfoBuilder, License},
};

use super::handlers::{
    error::ErrorDetail, health, items, menus, restaurants, sections, session, types,
};
use crate::{
    accounts::User,
    catalog::{Principal, Theme, ValidationErrors},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        session::register,
        session::me,
        session::logout,
        restaurants::list_restaurants,
        restaurants::create_restaurant,
        restaurants::get_restaurant,
        restaurants::update_restaurant,
        restaurants::delete_restaurant,
        restaurants::add_admin,
        restaurants::remove_admin,
        menus::list_menus,
        menus::create_menu,
        menus::get_menu,
        menus::update_menu,
        menus::delete_menu,
        sections::list_sections,
        sections::create_section,
        sections::get_section,
        sections::update_section,
        sections::delete_section,
        items::list_items,
        items::create_item,
        items::get_item,
        items::update_item,
        items::delete_item,
    ),
    components(schemas(
        health::Health,
        ErrorDetail,
        ValidationErrors,
        Principal,
        User,
        Theme,
        types::RegisterRequest,
        types::SessionResponse,
        types::CreateRestaurantRequest,
        types::UpdateRestaurantRequest,
        types::AddAdminRequest,
        types::RestaurantResponse,
        types::CreateMenuRequest,
        types::UpdateMenuRequest,
        types::MenuResponse,
        types::CreateSectionRequest,
        types::UpdateSectionRequest,
        types::SectionResponse,
        types::CreateItemRequest,
        types::UpdateItemRequest,
        types::ItemResponse,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "users", description = "Registration and sessions"),
        (name = "restaurants", description = "Restaurants and their administrators"),
        (name = "menus", description = "Menus of a restaurant"),
        (name = "sections", description = "Sections of a menu"),
        (name = "items", description = "Items of a menu section"),
    )
)]
pub struct ApiDoc;

/// The `OpenAPI` document with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info = cargo_info();
    doc
}

fn cargo_info() -> utoipa::openapi::Info {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();
    info
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        (!value.is_empty()).then_some(value)
    }
    match author.split_once('<') {
        Some((name, email)) => (
            non_empty(name.trim()),
            non_empty(email.trim_end_matches('>').trim()),
        ),
        None => (non_empty(author.trim()), None),
    }
}
