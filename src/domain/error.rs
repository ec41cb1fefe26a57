//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

/// Business rule violations and invalid domain input.
///
/// These errors are independent of the web/infrastructure layer and never
/// imply that any state was changed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Debit larger than the current balance
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// Invalid amount (zero, negative, malformed or exceeds limit)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Operation kind other than credit/debit
    #[error("Invalid operation kind: {0:?} (expected \"credit\" or \"debit\")")]
    InvalidKind(String),

    /// A user field failed validation
    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl DomainError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Create a field validation error
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Check if this error is a malformed-input error (as opposed to a
    /// business rule that rejected well-formed input)
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_) | Self::InvalidKind(_) | Self::InvalidField { .. }
        )
    }
}

impl From<super::AmountError> for DomainError {
    fn from(err: super::AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_funds_error() {
        let err = DomainError::insufficient_funds(dec!(100), dec!(50));

        assert!(!err.is_validation_error());
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
    }

    #[test]
    fn test_invalid_field_message() {
        let err = DomainError::invalid_field("First name", "cannot contain numbers");
        assert!(err.is_validation_error());
        assert_eq!(err.to_string(), "First name cannot contain numbers");
    }

    #[test]
    fn test_amount_error_conversion() {
        let err: DomainError = super::super::AmountError::Overflow.into();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }
}
