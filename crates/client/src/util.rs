//! Shared helpers for the upstream HTTP client.

use cm_domain::error::{Error, Result};

/// Environment variable carrying the Congress.gov API key. Secrets never
/// come from the config file.
pub const API_KEY_ENV: &str = "CONGRESS_API_KEY";

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from the process environment.
pub fn resolve_api_key() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::Auth(format!(
            "environment variable '{API_KEY_ENV}' not set"
        ))),
    }
}
