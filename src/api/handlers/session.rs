//! Registration, session lookup and logout.
//!
//! Tokens are accepted as `Authorization: Bearer <token>` or through the
//! `menus_session` cookie set at registration.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use tracing::error;

use super::{
    error::{ApiError, ErrorDetail},
    types::{RegisterRequest, SessionResponse},
};
use crate::{
    accounts::{AccountError, Accounts},
    catalog::{Actor, CatalogError, Principal, ValidationErrors},
};

pub const SESSION_COOKIE_NAME: &str = "menus_session";

#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered and signed in.", body = SessionResponse),
        (status = 400, description = "Invalid or taken username/email.", body = ValidationErrors),
    ),
    tag = "users"
)]
/// Registers a user and returns a fresh session token, also set as a cookie.
pub async fn register(
    accounts: Extension<Accounts>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = accounts
        .register(&request.username, &request.email)
        .await?;

    let mut headers = HeaderMap::new();
    match session_cookie(&session.token, accounts.session_ttl().as_secs()) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build session cookie: {err}"),
    }

    let body = SessionResponse {
        token: session.token,
        user: session.user,
    };
    Ok((StatusCode::CREATED, headers, Json(body)))
}

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The authenticated principal.", body = Principal),
        (status = 401, description = "Missing or invalid session.", body = ErrorDetail),
    ),
    tag = "users"
)]
pub async fn me(
    headers: HeaderMap,
    accounts: Extension<Accounts>,
) -> Result<impl IntoResponse, ApiError> {
    match resolve_actor(&headers, &accounts).await? {
        Actor::User(principal) => Ok(Json(principal)),
        Actor::Anonymous => Err(CatalogError::Unauthenticated.into()),
    }
}

#[utoipa::path(
    post,
    path = "/v1/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "users"
)]
pub async fn logout(headers: HeaderMap, accounts: Extension<Accounts>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = accounts.logout(&token).await {
            error!("Failed to delete session: {err}");
        }
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie() {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers)
}

/// Resolves the request's session token into an actor.
///
/// Missing, unknown and expired tokens all resolve to `Actor::Anonymous`.
///
/// # Errors
/// Store failures while looking up the session.
pub async fn resolve_actor(headers: &HeaderMap, accounts: &Accounts) -> Result<Actor, AccountError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(Actor::Anonymous);
    };
    let user = accounts.authenticate(&token).await?;
    Ok(Actor::from(user.map(Principal::from)))
}

fn session_cookie(token: &str, ttl_seconds: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    ))
}

fn clear_session_cookie() -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}

/// Bearer token first, then the session cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
