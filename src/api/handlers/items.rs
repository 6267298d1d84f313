//! Menu item endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::{
    error::{ApiError, ErrorDetail},
    session::resolve_actor,
    types::{CreateItemRequest, ItemResponse, UpdateItemRequest, responses},
};
use crate::{
    accounts::Accounts,
    catalog::{Catalog, ItemChanges, ValidationErrors},
};

type ItemPath = (String, String, String, String);

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}/items",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
    ),
    responses(
        (status = 200, description = "Items in creation order.", body = [ItemResponse]),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "items"
)]
pub async fn list_items(
    Path((restaurant_slug, menu_slug, section_slug)): Path<(String, String, String)>,
    catalog: Extension<Catalog>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = catalog
        .list_items(&restaurant_slug, &menu_slug, &section_slug)
        .await?;
    Ok(Json(responses(items)))
}

#[utoipa::path(
    post,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}/items",
    request_body = CreateItemRequest,
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
    ),
    responses(
        (status = 201, description = "Item created.", body = ItemResponse),
        (status = 400, description = "Invalid fields or duplicate within the section.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "items"
)]
pub async fn create_item(
    Path((restaurant_slug, menu_slug, section_slug)): Path<(String, String, String)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let item = catalog
        .create_item(
            &actor,
            &restaurant_slug,
            &menu_slug,
            &section_slug,
            &request.name,
            &request.description,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ItemResponse::from(item))))
}

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}/items/{item_slug}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
        ("item_slug" = String, Path, description = "Item slug"),
    ),
    responses(
        (status = 200, description = "Item detail.", body = ItemResponse),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "items"
)]
pub async fn get_item(
    Path((restaurant_slug, menu_slug, section_slug, item_slug)): Path<ItemPath>,
    catalog: Extension<Catalog>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = catalog
        .item(&restaurant_slug, &menu_slug, &section_slug, &item_slug)
        .await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}/items/{item_slug}",
    request_body = UpdateItemRequest,
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
        ("item_slug" = String, Path, description = "Item slug"),
    ),
    responses(
        (status = 200, description = "Item updated.", body = ItemResponse),
        (status = 400, description = "Invalid fields or duplicate within the section.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "items"
)]
pub async fn update_item(
    Path((restaurant_slug, menu_slug, section_slug, item_slug)): Path<ItemPath>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let changes = ItemChanges {
        name: request.name,
        description: request.description,
    };
    let item = catalog
        .update_item(
            &actor,
            &restaurant_slug,
            &menu_slug,
            &section_slug,
            &item_slug,
            changes,
        )
        .await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}/items/{item_slug}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
        ("item_slug" = String, Path, description = "Item slug"),
    ),
    responses(
        (status = 204, description = "Item deleted."),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "items"
)]
pub async fn delete_item(
    Path((restaurant_slug, menu_slug, section_slug, item_slug)): Path<ItemPath>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
) -> Result<StatusCode, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    catalog
        .delete_item(&actor, &restaurant_slug, &menu_slug, &section_slug, &item_slug)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
