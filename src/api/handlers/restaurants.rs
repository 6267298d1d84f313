//! Restaurant endpoints and admin membership.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use super::{
    error::{ApiError, ErrorDetail},
    session::resolve_actor,
    types::{
        AddAdminRequest, CreateRestaurantRequest, RestaurantResponse, UpdateRestaurantRequest,
        responses,
    },
};
use crate::{
    accounts::Accounts,
    catalog::{Catalog, ValidationErrors},
};

#[utoipa::path(
    get,
    path = "/v1/restaurants",
    responses(
        (status = 200, description = "All restaurants ordered by name.", body = [RestaurantResponse]),
    ),
    tag = "restaurants"
)]
pub async fn list_restaurants(
    catalog: Extension<Catalog>,
) -> Result<Json<Vec<RestaurantResponse>>, ApiError> {
    let restaurants = catalog.list_restaurants().await?;
    Ok(Json(responses(restaurants)))
}

#[utoipa::path(
    post,
    path = "/v1/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created; the caller becomes its admin.", body = RestaurantResponse),
        (status = 400, description = "Invalid, reserved or duplicate name.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
    ),
    tag = "restaurants"
)]
pub async fn create_restaurant(
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<CreateRestaurantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let restaurant = catalog.create_restaurant(&actor, &request.name).await?;
    Ok((StatusCode::CREATED, Json(RestaurantResponse::from(restaurant))))
}

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}",
    params(("restaurant_slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Restaurant detail.", body = RestaurantResponse),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "restaurants"
)]
pub async fn get_restaurant(
    Path(restaurant_slug): Path<String>,
    catalog: Extension<Catalog>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = catalog.restaurant(&restaurant_slug).await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/restaurants/{restaurant_slug}",
    request_body = UpdateRestaurantRequest,
    params(("restaurant_slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Restaurant renamed; the slug follows the name.", body = RestaurantResponse),
        (status = 400, description = "Invalid, reserved or duplicate name.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "restaurants"
)]
pub async fn update_restaurant(
    Path(restaurant_slug): Path<String>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<UpdateRestaurantRequest>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let restaurant = catalog
        .update_restaurant(&actor, &restaurant_slug, request.name.as_deref())
        .await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/restaurants/{restaurant_slug}",
    params(("restaurant_slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 204, description = "Restaurant and all of its menus deleted."),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "restaurants"
)]
pub async fn delete_restaurant(
    Path(restaurant_slug): Path<String>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
) -> Result<StatusCode, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    catalog.delete_restaurant(&actor, &restaurant_slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/restaurants/{restaurant_slug}/admins",
    request_body = AddAdminRequest,
    params(("restaurant_slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "User added to the restaurant admins.", body = RestaurantResponse),
        (status = 400, description = "Unknown username.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "restaurants"
)]
pub async fn add_admin(
    Path(restaurant_slug): Path<String>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<AddAdminRequest>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let restaurant = catalog
        .add_restaurant_admin(&actor, &restaurant_slug, request.username.trim())
        .await?;
    Ok(Json(restaurant.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/restaurants/{restaurant_slug}/admins/{user_id}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("user_id" = Uuid, Path, description = "Admin to remove"),
    ),
    responses(
        (status = 200, description = "User removed from the restaurant admins.", body = RestaurantResponse),
        (status = 400, description = "Not an admin, or the last admin.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant not found.", body = ErrorDetail),
    ),
    tag = "restaurants"
)]
pub async fn remove_admin(
    Path((restaurant_slug, user_id)): Path<(String, Uuid)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let restaurant = catalog
        .remove_restaurant_admin(&actor, &restaurant_slug, user_id)
        .await?;
    Ok(Json(restaurant.into()))
}
