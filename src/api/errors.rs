//! API Error Handling
//!
//! Economy errors become `{request_id, error: {code, message}}` bodies with a
//! status that tells the caller whether retrying can help.

use crate::errors::EconomyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable snake_case code, e.g. `not_enough_stars`
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: &'static str,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(request_id: String, code: &'static str, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            code,
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message),
            code: "internal_error",
            request_id,
        }
    }

    pub fn from_economy(request_id: String, err: EconomyError) -> Self {
        let code = err.code();
        let message = err.to_string();
        let kind = match err {
            EconomyError::NotFound(_) => ApiErrorKind::NotFound(message),
            EconomyError::StorageConflict { .. } => ApiErrorKind::Conflict(message),
            EconomyError::Storage(_) | EconomyError::Configuration(_) => ApiErrorKind::InternalError(message),
            _ => ApiErrorKind::BadRequest(message),
        };
        Self { kind, code, request_id }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ApiErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::Conflict(_) => StatusCode::CONFLICT,
            ApiErrorKind::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match &self.kind {
            ApiErrorKind::NotFound(msg)
            | ApiErrorKind::BadRequest(msg)
            | ApiErrorKind::Conflict(msg)
            | ApiErrorKind::InternalError(msg) => msg,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({}): {}", self.request_id, self.status(), self.code, self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message().to_string(),
            },
        });

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EconomyError::NotFound(1), StatusCode::NOT_FOUND),
            (EconomyError::StorageConflict { player_id: 1 }, StatusCode::CONFLICT),
            (EconomyError::InvalidItem("hat".into()), StatusCode::BAD_REQUEST),
            (
                EconomyError::InsufficientStars { needed: 2, available: 1 },
                StatusCode::BAD_REQUEST,
            ),
            (
                EconomyError::Storage(StorageError::ReadFailed("io".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from_economy("req-1".into(), err);
            assert_eq!(api.status(), status);
            assert_eq!(api.code, code);
        }
    }
}
