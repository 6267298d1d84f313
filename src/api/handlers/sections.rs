//! Menu section endpoints.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use super::{
    error::{ApiError, ErrorDetail},
    session::resolve_actor,
    types::{CreateSectionRequest, SectionResponse, UpdateSectionRequest, responses},
};
use crate::{
    accounts::Accounts,
    catalog::{Catalog, ValidationErrors},
};

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
    ),
    responses(
        (status = 200, description = "Sections in creation order.", body = [SectionResponse]),
        (status = 404, description = "Restaurant or menu not found.", body = ErrorDetail),
    ),
    tag = "sections"
)]
pub async fn list_sections(
    Path((restaurant_slug, menu_slug)): Path<(String, String)>,
    catalog: Extension<Catalog>,
) -> Result<Json<Vec<SectionResponse>>, ApiError> {
    let sections = catalog.list_sections(&restaurant_slug, &menu_slug).await?;
    Ok(Json(responses(sections)))
}

#[utoipa::path(
    post,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections",
    request_body = CreateSectionRequest,
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
    ),
    responses(
        (status = 201, description = "Section created.", body = SectionResponse),
        (status = 400, description = "Invalid name or duplicate within the menu.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "Restaurant or menu not found.", body = ErrorDetail),
    ),
    tag = "sections"
)]
pub async fn create_section(
    Path((restaurant_slug, menu_slug)): Path<(String, String)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<CreateSectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let section = catalog
        .create_section(&actor, &restaurant_slug, &menu_slug, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(SectionResponse::from(section))))
}

#[utoipa::path(
    get,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
    ),
    responses(
        (status = 200, description = "Section detail.", body = SectionResponse),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "sections"
)]
pub async fn get_section(
    Path((restaurant_slug, menu_slug, section_slug)): Path<(String, String, String)>,
    catalog: Extension<Catalog>,
) -> Result<Json<SectionResponse>, ApiError> {
    let section = catalog
        .section(&restaurant_slug, &menu_slug, &section_slug)
        .await?;
    Ok(Json(section.into()))
}

#[utoipa::path(
    patch,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}",
    request_body = UpdateSectionRequest,
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
    ),
    responses(
        (status = 200, description = "Section renamed.", body = SectionResponse),
        (status = 400, description = "Invalid name or duplicate within the menu.", body = ValidationErrors),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "sections"
)]
pub async fn update_section(
    Path((restaurant_slug, menu_slug, section_slug)): Path<(String, String, String)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
    Json(request): Json<UpdateSectionRequest>,
) -> Result<Json<SectionResponse>, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    let section = catalog
        .update_section(
            &actor,
            &restaurant_slug,
            &menu_slug,
            &section_slug,
            request.name.as_deref(),
        )
        .await?;
    Ok(Json(section.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/restaurants/{restaurant_slug}/menus/{menu_slug}/sections/{section_slug}",
    params(
        ("restaurant_slug" = String, Path, description = "Restaurant slug"),
        ("menu_slug" = String, Path, description = "Menu slug"),
        ("section_slug" = String, Path, description = "Section slug"),
    ),
    responses(
        (status = 204, description = "Section and its items deleted."),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
        (status = 403, description = "Caller is not an admin of this restaurant.", body = ErrorDetail),
        (status = 404, description = "A path segment did not resolve.", body = ErrorDetail),
    ),
    tag = "sections"
)]
pub async fn delete_section(
    Path((restaurant_slug, menu_slug, section_slug)): Path<(String, String, String)>,
    headers: HeaderMap,
    catalog: Extension<Catalog>,
    accounts: Extension<Accounts>,
) -> Result<StatusCode, ApiError> {
    let actor = resolve_actor(&headers, &accounts).await?;
    catalog
        .delete_section(&actor, &restaurant_slug, &menu_slug, &section_slug)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
