//! Input validation helpers
//!
//! Length limits for category fields. Lengths are counted in characters,
//! not bytes.

use crate::error::{TreeError, TreeResult};

// ── Text length limits ──────────────────────────────────────────────

/// Category names
pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 100;

/// Category descriptions
pub const MAX_DESCRIPTION_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate a category name, returning it trimmed
pub fn validate_name(value: &str) -> TreeResult<String> {
    let name = value.trim();
    let len = name.chars().count();
    if len < MIN_NAME_LEN {
        return Err(TreeError::Validation(format!(
            "name is too short ({len} chars, min {MIN_NAME_LEN})"
        )));
    }
    if len > MAX_NAME_LEN {
        return Err(TreeError::Validation(format!(
            "name is too long ({len} chars, max {MAX_NAME_LEN})"
        )));
    }
    Ok(name.to_string())
}

/// Validate an optional description; blank descriptions become `None`
pub fn validate_description(value: Option<&str>) -> TreeResult<Option<String>> {
    let Some(description) = value.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(TreeError::Validation(format!(
            "description is too long ({len} chars, max {MAX_DESCRIPTION_LEN})"
        )));
    }
    Ok(Some(description.to_string()))
}
