//! Errors returned by the plant-care service client.

use thiserror::Error;

use crate::model::ValidationError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The token is missing, expired or rejected. The stored token must be
    /// discarded and the user asked to sign in again.
    #[error("not authorized, please log in again")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid plant: {0}")]
    Validation(#[from] ValidationError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
