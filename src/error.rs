//! Request-level error taxonomy and its HTTP mapping

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::IdentityError;
use crate::model::ValidationError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// No valid caller could be resolved; the cause is logged, never returned
    #[error("Unauthorized")]
    Authentication(#[from] IdentityError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Persistence(#[from] StoreError),
    /// The request body could not be read, e.g. it exceeds the configured limit
    #[error("Request body rejected: {}", .0.body_text())]
    Body(#[from] BytesRejection),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Body(rejection) => rejection.status(),
        }
    }
}

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
