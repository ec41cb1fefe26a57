//! User field validation
//!
//! Format rules for the identity fields accepted by the user endpoints.

use once_cell::sync::Lazy;
use regex::Regex;

use super::DomainError;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 50;

/// Validate a personal name or username.
///
/// Letters and single inner spaces only, 3 to 50 characters.
pub fn validate_name(value: &str, field: &'static str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid_field(field, "is required"));
    }
    if value.trim() != value {
        return Err(DomainError::invalid_field(
            field,
            "cannot have leading or trailing spaces",
        ));
    }
    if value.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::invalid_field(field, "cannot contain numbers"));
    }
    if !value.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        return Err(DomainError::invalid_field(
            field,
            "can only contain alphabetic characters and spaces",
        ));
    }
    if value.contains("  ") {
        return Err(DomainError::invalid_field(field, "cannot have consecutive spaces"));
    }
    if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&value.len()) {
        return Err(DomainError::invalid_field(
            field,
            format!("must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters long"),
        ));
    }
    Ok(())
}

/// Usernames follow the same rules as personal names
pub fn validate_username(value: &str) -> Result<(), DomainError> {
    validate_name(value, "Username")
}

/// Validate an email address
pub fn validate_email(value: &str) -> Result<(), DomainError> {
    if value.is_empty() || !EMAIL_REGEX.is_match(value) {
        return Err(DomainError::invalid_field("Email", "must be a valid email address"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: DomainError) -> String {
        match err {
            DomainError::InvalidField { reason, .. } => reason,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_names() {
        assert!(validate_name("Ada", "First name").is_ok());
        assert!(validate_name("Mary Ann", "First name").is_ok());
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(reason(validate_name("", "Username").unwrap_err()), "is required");
        assert_eq!(
            reason(validate_name(" Bob", "Username").unwrap_err()),
            "cannot have leading or trailing spaces"
        );
        assert_eq!(
            reason(validate_name("Bob2", "Username").unwrap_err()),
            "cannot contain numbers"
        );
        assert_eq!(
            reason(validate_name("Bob!", "Username").unwrap_err()),
            "can only contain alphabetic characters and spaces"
        );
        assert_eq!(
            reason(validate_name("Bo  b", "Username").unwrap_err()),
            "cannot have consecutive spaces"
        );
        assert!(reason(validate_name("Bo", "Username").unwrap_err()).starts_with("must be between"));
        assert!(validate_name(&"a".repeat(51), "Username").is_err());
    }

    #[test]
    fn test_username_reports_its_field() {
        match validate_username("x").unwrap_err() {
            DomainError::InvalidField { field, .. } => assert_eq!(field, "Username"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("first.last+tag@mail.example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("ada example.com").is_err());
    }
}
