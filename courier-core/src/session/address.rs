//! Destination address normalization

use crate::error::SessionError;

/// Turn a phone-number-like string into a network address
///
/// Non-digit characters are stripped and `@<domain>` is appended. Inputs that
/// already carry a domain are passed through unchanged.
pub fn normalize_destination(raw: &str, domain: &str) -> Result<String, SessionError> {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        return Ok(trimmed.to_string());
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(SessionError::InvalidDestination(raw.to_string()));
    }

    Ok(format!("{}@{}", digits, domain))
}
