//! Request parameter validation helpers.
//!
//! Every endpoint validates one to three string parameters the same way:
//! present, non-empty after trimming, optionally bounded in length. Oversized
//! free-text inputs are truncated rather than rejected.

use crate::error::CoreError;

/// Require a present, non-empty string parameter and return it trimmed.
///
/// # Errors
/// Returns [`CoreError::InvalidParameter`] if the parameter is absent or
/// blank.
pub fn require_param<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, CoreError> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidParameter {
            name: name.to_owned(),
            reason: "required and must be a non-empty string".to_owned(),
        });
    }
    Ok(trimmed)
}

/// Require a non-empty parameter that is at most `max_chars` characters long.
///
/// # Errors
/// Returns [`CoreError::InvalidParameter`] if the parameter is absent, blank,
/// or longer than `max_chars`.
pub fn require_bounded<'a>(
    name: &str,
    value: Option<&'a str>,
    max_chars: usize,
) -> Result<&'a str, CoreError> {
    let trimmed = require_param(name, value)?;
    if trimmed.chars().count() > max_chars {
        return Err(CoreError::InvalidParameter {
            name: name.to_owned(),
            reason: format!("must be at most {max_chars} characters"),
        });
    }
    Ok(trimmed)
}

/// Truncate free-text input to `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_input(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
