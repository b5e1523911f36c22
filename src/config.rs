//! Configuration module for Gmail API access and server settings
//!
//! All configuration is loaded from environment variables with the `GMAIL_`
//! prefix. OAuth token acquisition and refresh are handled outside this
//! process; the server consumes a ready-to-use bearer token.

use std::env;
use std::env::VarError;

use secrecy::SecretString;

use crate::errors::{AppError, AppResult};

/// Default Gmail REST API base URL
const DEFAULT_API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Server-wide configuration
///
/// Cloned into MCP tool handlers via `Arc` for thread-safe shared access.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// OAuth bearer token stored in a type that prevents accidental logging
    pub access_token: SecretString,
    /// Gmail REST API base URL (overridable for testing)
    pub api_base_url: String,
    /// Sender identity used in the From header (Gmail resolves `me`)
    pub sender: String,
    /// Whether destructive operations (message/label deletion) are enabled
    pub write_enabled: bool,
    /// HTTP request timeout in milliseconds
    pub http_timeout_ms: u64,
    /// Directory where downloaded attachments are saved
    pub attachment_dir: String,
}

impl ServerConfig {
    /// Load all configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `GMAIL_ACCESS_TOKEN` is missing or any
    /// optional variable is set to a malformed value.
    ///
    /// # Example Environment
    ///
    /// ```text
    /// GMAIL_ACCESS_TOKEN=ya29....
    /// GMAIL_SENDER=user@gmail.com
    /// GMAIL_WRITE_ENABLED=false
    /// GMAIL_ATTACHMENT_DIR=/tmp/attachments
    /// ```
    pub fn load_from_env() -> AppResult<Self> {
        let access_token = required_env("GMAIL_ACCESS_TOKEN")?;

        Ok(Self {
            access_token: SecretString::new(access_token.into()),
            api_base_url: optional_env("GMAIL_API_BASE_URL", DEFAULT_API_BASE_URL)?,
            sender: optional_env("GMAIL_SENDER", "me")?,
            write_enabled: parse_bool_env("GMAIL_WRITE_ENABLED", false)?,
            http_timeout_ms: parse_u64_env("GMAIL_HTTP_TIMEOUT_MS", 30_000)?,
            attachment_dir: optional_env("GMAIL_ATTACHMENT_DIR", "./attachments")?,
        })
    }
}

/// Read a required environment variable, returning error if missing or empty
fn required_env(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::InvalidInput(format!(
            "missing required environment variable {key}"
        ))),
    }
}

/// Read an optional environment variable with a default fallback
///
/// Empty or whitespace-only values fall back to the default.
fn optional_env(key: &str, default: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_owned()),
        Ok(_) | Err(VarError::NotPresent) => Ok(default.to_owned()),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a boolean environment variable with flexible values
///
/// Accepts: `1`, `true`, `yes`, `y`, `on` (truthy) or `0`, `false`, `no`,
/// `n`, `off` (falsy). Case-insensitive. Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set to an unrecognized value.
fn parse_bool_env(key: &str, default: bool) -> AppResult<bool> {
    match env::var(key) {
        Ok(v) => parse_bool_value(&v).ok_or_else(|| {
            AppError::InvalidInput(format!("invalid boolean environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u64` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `InvalidInput` if the variable is set but not a valid `u64`.
fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|_| {
            AppError::InvalidInput(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::InvalidInput(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_bool_value;

    #[test]
    fn parse_bool_value_accepts_common_truthy_and_falsy_values() {
        for truthy in ["1", "true", "TRUE", " yes ", "Y", "on"] {
            assert_eq!(parse_bool_value(truthy), Some(true));
        }

        for falsy in ["0", "false", "FALSE", " no ", "N", "off"] {
            assert_eq!(parse_bool_value(falsy), Some(false));
        }
    }

    #[test]
    fn parse_bool_value_rejects_unrecognized_values() {
        for invalid in ["", "2", "maybe", "enabled", "disabled"] {
            assert_eq!(parse_bool_value(invalid), None);
        }
    }
}
