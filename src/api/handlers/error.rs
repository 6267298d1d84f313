//! HTTP mapping for domain errors.
//!
//! Validation failures become `400` with a field map, store failures and
//! contract violations are logged server-side and surface as a bare `500`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

use crate::{accounts::AccountError, catalog::CatalogError};

/// Body for non-validation client errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub detail: String,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorDetail {
            detail: message.into(),
        }),
    )
        .into_response()
}

/// Error returned by every handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Catalog(err) => err.into_response(),
            Self::Account(err) => err.into_response(),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Self::Unauthenticated => detail(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            ),
            Self::PermissionDenied => detail(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            Self::NotFound(kind) => {
                detail(StatusCode::NOT_FOUND, format!("No {kind} matches the given query."))
            }
            Self::ContractViolation(message) => {
                error!("Contract violation: {message}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Store(err) => {
                error!("Store error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Self::Token(err) => {
                error!("Failed to generate session token: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::Store(err) => {
                error!("Store error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityKind, StoreError, ValidationErrors};

    #[test]
    fn catalog_errors_map_to_status_codes() {
        let cases = [
            (
                CatalogError::Validation(ValidationErrors::single("name", "bad")),
                StatusCode::BAD_REQUEST,
            ),
            (CatalogError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (CatalogError::PermissionDenied, StatusCode::FORBIDDEN),
            (CatalogError::NotFound(EntityKind::Menu), StatusCode::NOT_FOUND),
            (
                CatalogError::ContractViolation("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CatalogError::Store(StoreError::UniqueViolation),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
