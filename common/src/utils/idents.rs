//! SQL identifier validation.
//!
//! Table and column names coming from files and UI fields end up inside
//! generated DDL, so they are restricted to a safe character set before any
//! SQL is built from them.

use crate::errors::{AppError, AppResult};

/// Validates a table or column name for use in generated SQL.
///
/// Accepts ASCII letters, digits and underscores; the first character must
/// not be a digit. Length is capped at 128.
pub fn validate_identifier(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::Validation("Identifier must not be empty".into()));
    }
    if name.len() > 128 {
        return Err(AppError::Validation(format!(
            "Identifier too long: {}",
            name
        )));
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(AppError::Validation(format!(
            "Identifier must start with a letter or underscore: {}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::Validation(format!(
            "Identifier contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

/// Rewrites an arbitrary string (usually a file stem) into a valid
/// identifier: spaces and dashes become underscores, anything else
/// invalid is dropped.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            ' ' | '-' => out.push('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => out.push(c),
            _ => {}
        }
    }
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("cities").is_ok());
        assert!(validate_identifier("_tmp_2024").is_ok());
        assert!(validate_identifier("Weather_Stations").is_ok());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("drop table; --").is_err());
        assert!(validate_identifier("naïve").is_err());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_identifier("my cities-2024"), "my_cities_2024");
        assert_eq!(sanitize_identifier("2024 data"), "_2024_data");
    }
}
