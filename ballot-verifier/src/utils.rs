//! Shared utility functions for the verifier

use tracing::info;

use crate::error::LedgerError;

/// Validate a ledger base URL and return it without trailing slashes.
pub fn normalize_base_url(url: &str) -> Result<String, LedgerError> {
    let trimmed = url.trim().trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => {
            Ok(trimmed.to_string())
        }
        _ => {
            info!(
                "Invalid ledger url '{}'. Must be an http:// or https:// address",
                url
            );
            Err(LedgerError::InvalidUrl(url.to_string()))
        }
    }
}

/// Parse an environment variable into a type implementing FromStr, with a default fallback
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
