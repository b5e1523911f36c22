//! Application error model with MCP error mapping
//!
//! Defines a typed error hierarchy using `thiserror` for internal error handling,
//! and maps each variant to the appropriate MCP `ErrorData` type for protocol
//! compliance.

use rmcp::model::ErrorData;
use serde_json::json;
use thiserror::Error;

/// Application error type
///
/// Covers all error cases the Gmail MCP server may encounter. Each variant maps
/// to an appropriate MCP error code in [`ErrorData`].
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid user input (validation failed, malformed request)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Recipient address failed syntax validation
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    /// Part body data is not valid base64url
    #[error("invalid base64url data: {0}")]
    InvalidBase64(String),
    /// Decoded part bytes are not valid UTF-8 (carries the part's mime type)
    #[error("failed to decode part body as UTF-8: {0}")]
    Decode(String),
    /// Resource not found (message, label, attachment)
    #[error("not found: {0}")]
    NotFound(String),
    /// Authentication failure (expired or rejected access token)
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Gmail API returned an error response
    #[error("upstream error: {0}")]
    Upstream(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidInput`
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Convert to MCP `ErrorData`
    ///
    /// Maps each `AppError` variant to the appropriate MCP error type and
    /// includes a structured `code` field for client error handling.
    ///
    /// # Mappings
    ///
    /// - `InvalidInput` → `invalid_params`
    /// - `InvalidAddress` → `invalid_params`
    /// - `InvalidBase64` → `internal_error`
    /// - `Decode` → `internal_error`
    /// - `NotFound` → `resource_not_found`
    /// - `AuthFailed` → `invalid_request`
    /// - `Upstream` → `internal_error`
    /// - `Internal` → `internal_error`
    pub fn to_error_data(&self) -> ErrorData {
        match self {
            Self::InvalidInput(msg) => {
                ErrorData::invalid_params(msg.clone(), Some(json!({ "code": "invalid_input" })))
            }
            Self::InvalidAddress(addr) => ErrorData::invalid_params(
                format!("invalid email address: {addr}"),
                Some(json!({ "code": "invalid_address" })),
            ),
            Self::InvalidBase64(msg) => ErrorData::internal_error(
                format!("invalid base64url data: {msg}"),
                Some(json!({ "code": "invalid_base64" })),
            ),
            Self::Decode(mime_type) => ErrorData::internal_error(
                format!("failed to decode part body as UTF-8: {mime_type}"),
                Some(json!({ "code": "decode_error" })),
            ),
            Self::NotFound(msg) => {
                ErrorData::resource_not_found(msg.clone(), Some(json!({ "code": "not_found" })))
            }
            Self::AuthFailed(msg) => {
                ErrorData::invalid_request(msg.clone(), Some(json!({ "code": "auth_failed" })))
            }
            Self::Upstream(msg) => {
                ErrorData::internal_error(msg.clone(), Some(json!({ "code": "upstream" })))
            }
            Self::Internal(msg) => {
                ErrorData::internal_error(msg.clone(), Some(json!({ "code": "internal" })))
            }
        }
    }
}

/// Type alias for fallible return values
///
/// Use this for all internal functions that can fail. Provides a consistent
/// error type throughout the codebase.
pub type AppResult<T> = Result<T, AppError>;
