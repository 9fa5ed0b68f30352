//! Error mapping for the HTTP surface.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core::error::RegistryError;

/// Header carrying a short error summary on every error response.
pub const ERROR_HEADER: &str = "X-ASIT-ERROR";

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// HTTP rendering of a [`RegistryError`].
#[derive(Debug)]
pub struct ApiError(pub RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

/// Status code for each error kind.
pub fn status_for(error: &RegistryError) -> StatusCode {
    match error {
        RegistryError::EntityNotFound => StatusCode::NOT_FOUND,
        RegistryError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        RegistryError::NonUniqueClientKey { .. } => StatusCode::CONFLICT,
        RegistryError::ConcurrentUpdate { .. }
        | RegistryError::Storage { .. }
        | RegistryError::Encoding { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = self.0.to_string();
        let mut response = (
            status,
            Json(ErrorBody {
                message: message.clone(),
            }),
        )
            .into_response();
        // Header values must be visible ASCII; fall back to the body when the
        // message (it can embed an arbitrary client key) is not.
        if let Ok(value) = HeaderValue::from_str(&message) {
            response.headers_mut().insert(ERROR_HEADER, value);
        }
        response
    }
}
