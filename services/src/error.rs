//! Domain error taxonomy and its HTTP mapping.
//!
//! Every operation surfaces one of these kinds; the routing layer maps them
//! to status codes in one place. The core never retries or suppresses an
//! error: the first failure aborts the operation and rolls back any open
//! transaction.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing required input.
    #[error("bad parameter: {0}")]
    BadParam(String),

    /// The caller lacks rights for the target resource.
    #[error("forbidden")]
    Forbidden,

    /// The target row is absent.
    #[error("record not found")]
    NotFound,

    /// Optimistic-concurrency violation: the caller's view is stale.
    #[error("record modified behind the caller's baseline")]
    ModifyBehind,

    /// Any other backend failure, propagated verbatim.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn bad_param(message: impl Into<String>) -> Self {
        Self::BadParam(message.into())
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Generic JSON error body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::BadParam(_) => (StatusCode::BAD_REQUEST, "bad_param", self.to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            Self::ModifyBehind => (StatusCode::CONFLICT, "modify_behind", self.to_string()),
            Self::Storage(detail) => {
                tracing::error!("storage failure: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "storage failure".to_owned(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: code.to_owned(),
                message,
            }),
        )
            .into_response()
    }
}
