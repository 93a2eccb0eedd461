//! Input checks run by the CLI and MCP layers before calling into the ledger.

use thiserror::Error;

use crate::ledger::DEFAULT_TARGET;

pub const MAX_NAME_CHARS: usize = 28;
/// Upper bound on a history window, about ten years.
pub const MAX_HISTORY_DAYS: usize = 3660;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("habit name cannot be empty")]
    EmptyName,
    #[error("habit name is {len} characters, the limit is {MAX_NAME_CHARS}")]
    NameTooLong { len: usize },
    #[error("target must be a whole number of days, got '{0}'")]
    InvalidTarget(String),
    #[error("history window must be 1 to {MAX_HISTORY_DAYS} days, got {0}")]
    DaysOutOfRange(usize),
}

/// Trim and check a habit name.
pub fn validate_habit_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong { len });
    }
    Ok(name.to_string())
}

/// Parse a target typed by a user. Blank input means the default of 7 days;
/// leading digits are taken the way a form field reads them ("10 days" → 10),
/// and zero falls back to the default.
pub fn parse_target(raw: &str) -> Result<i64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TARGET as i64);
    }
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let parsed: i64 = trimmed[..end]
        .parse()
        .map_err(|_| ValidationError::InvalidTarget(raw.to_string()))?;
    Ok(if parsed == 0 { DEFAULT_TARGET as i64 } else { parsed })
}

/// Check a requested history window before any dates are generated.
pub fn validate_days(days: usize) -> Result<usize, ValidationError> {
    if (1..=MAX_HISTORY_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ValidationError::DaysOutOfRange(days))
    }
}

/// Convert a possibly fractional day count into the ledger's integer target.
pub fn floor_target(days: f64) -> i64 {
    if days.is_finite() { days.floor() as i64 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_habit_name("  Read  ").unwrap(), "Read");
        assert_eq!(validate_habit_name("   "), Err(ValidationError::EmptyName));
        assert!(validate_habit_name(&"é".repeat(28)).is_ok());
        assert_eq!(
            validate_habit_name(&"a".repeat(29)),
            Err(ValidationError::NameTooLong { len: 29 })
        );
    }

    #[test]
    fn targets_parse_like_a_form_field() {
        assert_eq!(parse_target(""), Ok(7));
        assert_eq!(parse_target("21"), Ok(21));
        assert_eq!(parse_target("10 days"), Ok(10));
        assert_eq!(parse_target("0"), Ok(7));
        assert_eq!(parse_target("-3"), Ok(-3));
        assert!(matches!(parse_target("abc"), Err(ValidationError::InvalidTarget(_))));
    }

    #[test]
    fn history_window_is_bounded() {
        assert_eq!(validate_days(1), Ok(1));
        assert_eq!(validate_days(MAX_HISTORY_DAYS), Ok(MAX_HISTORY_DAYS));
        assert_eq!(validate_days(0), Err(ValidationError::DaysOutOfRange(0)));
        assert_eq!(
            validate_days(usize::MAX),
            Err(ValidationError::DaysOutOfRange(usize::MAX))
        );
    }

    #[test]
    fn fractional_targets_floor() {
        assert_eq!(floor_target(7.9), 7);
        assert_eq!(floor_target(f64::NAN), 0);
        assert_eq!(floor_target(-0.5), -1);
    }
}
