//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::InvalidFormat`] → 400
/// - [`ServiceError::Forbidden`] → 403
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::FieldUnreadable`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — missing actor header, bad user id, or invalid JSON.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The submitted value does not match the field's format rule.
    #[error("invalid format for field {0}")]
    InvalidFormat(String),

    /// The actor is not allowed to access the requested field.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested field or route does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value could not be encrypted or decrypted.
    ///
    /// The message is deliberately generic; the cause is only logged server-side.
    #[error("field unreadable")]
    FieldUnreadable,

    /// The storage backend is temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::InvalidFormat(_) => 400,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::FieldUnreadable => 500,
            ServiceError::Unavailable(_) => 503,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::InvalidFormat(_) => "invalid_format",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::FieldUnreadable => "internal_error",
            ServiceError::Unavailable(_) => "service_unavailable",
        }
    }
}
