//! Menu endpoints scoped to a restaurant.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::{
    error::{ApiError, ErrorDetail},
    session::resolve_actor,
    types::{CreateMenuRequest, MenuResponse, UpdateMenuRequest, responses},
};
use crate::{
    accounts::Accounts,
    catalog::{Catalog, MenuChanges, ValidationErrors},
};

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}/menus",
    params(("restaurant_slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Menus ordered by name.", body = [MenuResponse]),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "menus"
)]
pub async fn list_menus(
    Path(restaurant_slug): Path<String>,
    catalog: Extension<Catalog>,
) -> Result<Json<Vec<MenuResponse>>, ApiError> {
    let menus = catalog.list_menus(&restaurant_slug).await?;
    Ok(Json(responses(menus)))
}

#[utoipa::path(
    post,
    path = "/v1/restaurants/{restaurant_slug}/menus",
    request_body = CreateMenuRequest,
    params(("restaurant_slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 201, description = "Menu created.", body = MenuResponse),
        (status = 400, description = "Invalid name or theme, or duplicate within the restaurant.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "menus"
)]
pub async fn create_menu(
    Path(restaurant_slug): Path<String>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<CreateMenuRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let menu = catalog
        .create_menu(
            &actor,
            &restaurant_slug,
            &request.name,
            request.theme.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(MenuResponse::from(menu))))
}

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
    ),
    responses(
        (status = 200, description = "Menu detail.", body = MenuResponse),
        (status = 404, description = "Restaurant or menu not found.", body = ErrorDetail),
    ),
    tag = "menus"
)]
pub async fn get_menu(
    Path((restaurant_slug, menu_slug)): Path<(String, String)>,
    catalog: Extension<Catalog>,
) -> Result<Json<MenuResponse>, ApiError> {
    let menu = catalog.menu(&restaurant_slug, &menu_slug).await?;
    Ok(Json(menu.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}",
    request_body = UpdateMenuRequest,
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
    ),
    responses(
        (status = 200, description = "Menu updated.", body = MenuResponse),
        (status = 400, description = "Invalid name or theme, or duplicate within the restaurant.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant or menu not found.", body = ErrorDetail),
    ),
    tag = "menus"
)]
pub async fn update_menu(
    Path((restaurant_slug, menu_slug)): Path<(String, String)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<UpdateMenuRequest>,
) -> Result<Json<MenuResponse>, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let changes = MenuChanges {
        name: request.name,
        theme: request.theme,
    };
    let menu = catalog
        .update_menu(&actor, &restaurant_slug, &menu_slug, changes)
        .await?;
    Ok(Json(menu.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
    ),
    responses(
        (status = 204, description = "Menu and its sections deleted."),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant or menu not found.", body = ErrorDetail),
    ),
    tag = "menus"
)]
pub async fn delete_menu(
    Path((restaurant_slug, menu_slug)): Path<(String, String)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
) -> Result<StatusCode, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    catalog
        .delete_menu(&actor, &restaurant_slug, &menu_slug)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
