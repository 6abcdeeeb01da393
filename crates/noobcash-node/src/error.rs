//! Node-level errors and their HTTP mapping.
//!
//! Internal operations return [`NodeError`]; the route layer converts each
//! kind to its status code with a `{"message": …}` body, preserving the
//! split between "request refused" (4xx) and "node bug" (5xx).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use noobcash_core::error::{BlockError, ChainError, CryptoError, TransactionError};

#[derive(Error, Debug)]
pub enum NodeError {
    /// Bad input: signature, amount, hash, or malformed payload.
    #[error("{0}")]
    Invalid(String),
    /// Unknown address or peer.
    #[error("{0}")]
    NotFound(String),
    /// Recipient and sender collide, or the roster is already full.
    #[error("{0}")]
    Conflict(String),
    /// Reserved.
    #[error("{0}")]
    Unauthorized(String),
    /// A bug or an unreachable state, never caused by the request.
    #[error("{0}")]
    Internal(String),
}

impl NodeError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<TransactionError> for NodeError {
    fn from(error: TransactionError) -> Self {
        Self::Invalid(error.to_string())
    }
}

impl From<BlockError> for NodeError {
    fn from(error: BlockError) -> Self {
        Self::Invalid(error.to_string())
    }
}

impl From<ChainError> for NodeError {
    fn from(error: ChainError) -> Self {
        Self::Invalid(error.to_string())
    }
}

impl From<CryptoError> for NodeError {
    fn from(error: CryptoError) -> Self {
        Self::Invalid(error.to_string())
    }
}
