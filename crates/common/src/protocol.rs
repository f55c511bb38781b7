//! Request and response types exchanged with the user-fields HTTP API.
//!
//! All bodies are JSON. Field values travel as plaintext UTF-8 strings over the
//! API; only the storage layer ever sees ciphertext.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Single field
// ---------------------------------------------------------------------------

/// Request body for `PUT /users/{id}/fields/{field}`.
///
/// An empty `value` clears the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldUpdateRequest {
    /// Raw value as typed by the user.
    pub value: String,
}

/// Response body for `GET /users/{id}/fields/{field}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValueResponse {
    /// Owner of the field.
    pub user_id: u64,
    /// Field slug, e.g. `"personal-id"`.
    pub field: String,
    /// Decrypted value; empty when the field is unset.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Profile form
// ---------------------------------------------------------------------------

/// One input of the profile form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileField {
    /// Field slug.
    pub field: String,
    /// Human-readable label.
    pub label: String,
    /// Current decrypted value (empty when unset).
    pub value: String,
    /// Input placeholder, e.g. `"YYMMDD-XXXX"`.
    pub placeholder: String,
    /// Hint shown next to the input.
    pub hint: String,
    /// Notice shown below the input, e.g. the consent text for the personal ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response body for `GET /users/{id}/profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user_id: u64,
    pub fields: Vec<ProfileField>,
}

// ---------------------------------------------------------------------------
// Results grid
// ---------------------------------------------------------------------------

/// A column header of the users grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridColumn {
    /// Column key, e.g. `"personal-number"`.
    pub key: String,
    /// Column header label.
    pub label: String,
}

/// One row of the users grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridRow {
    pub user_id: u64,
    /// Cell values in column order; `None` when the cell could not be read.
    pub cells: Vec<Option<String>>,
}

/// Response body for `GET /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridResponse {
    pub columns: Vec<GridColumn>,
    pub rows: Vec<GridRow>,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Always `true` once the service answers: startup aborts without a valid
    /// field encryption key.
    pub key_loaded: bool,
    /// Number of membership groups currently known.
    pub groups_loaded: usize,
}
