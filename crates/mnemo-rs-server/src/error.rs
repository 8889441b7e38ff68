//! Error responses for the HTTP surface.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mnemo_rs_core::MnemoCoreError;
use mnemo_rs_protocol::InvalidSessionId;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "INVALID_INPUT",
            ApiError::Upstream(_) => "COMPLETION_FAILED",
            ApiError::Internal(_) => "STORAGE_ERROR",
        }
    }
}

impl From<MnemoCoreError> for ApiError {
    fn from(err: MnemoCoreError) -> Self {
        match err {
            MnemoCoreError::InvalidInput(message) => ApiError::BadRequest(message),
            MnemoCoreError::Completion(err) => ApiError::Upstream(err.to_string()),
            MnemoCoreError::Memory(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<InvalidSessionId> for ApiError {
    fn from(err: InvalidSessionId) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            code: self.code(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use mnemo_rs_core::MnemoCoreError;
    use mnemo_rs_memory::MemoryError;
    use mnemo_rs_protocol::CompletionError;
    use pretty_assertions::assert_eq;

    #[test]
    fn core_errors_map_to_status_codes() {
        let cases = [
            (
                MnemoCoreError::InvalidInput("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                MnemoCoreError::Completion(CompletionError::Transport("down".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                MnemoCoreError::Memory(MemoryError::Corrupt("bad line".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
