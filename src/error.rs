//! Error taxonomy for the API surface.
//!
//! Handlers catch every foreseeable failure and map it here; nothing escapes
//! unmapped. Each variant carries the message that ends up in the
//! `{error: ...}` envelope, except `Internal`, whose detail is logged
//! server-side and replaced with a generic message.

use axum::http::StatusCode;
use thiserror::Error;

use crate::validate::ValidationError;
use crate::xml::CodecError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed JSON/XML request body.
    #[error("{0}")]
    Parse(String),

    /// Schema or domain rule violation.
    #[error("{0}")]
    Validation(String),

    /// No record with the requested ID.
    #[error("Reservation {0} not found")]
    NotFound(String),

    /// Persistence failure or other unexpected condition.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Parse(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients. Internal details stay out of responses.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
