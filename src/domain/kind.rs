//! Transaction kind
//!
//! The single discriminant that selects credit or debit semantics in the
//! balance mutator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// Kind of a balance mutation and of the audit record it leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            other => Err(DomainError::InvalidKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("credit".parse::<TransactionKind>().unwrap(), TransactionKind::Credit);
        assert_eq!(" DEBIT ".parse::<TransactionKind>().unwrap(), TransactionKind::Debit);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = "refund".parse::<TransactionKind>().unwrap_err();
        assert_eq!(err, DomainError::InvalidKind("refund".to_string()));
    }

    #[test]
    fn test_kind_round_trips_through_database_text() {
        for kind in [TransactionKind::Credit, TransactionKind::Debit] {
            assert_eq!(TransactionKind::try_from(kind.as_str().to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&TransactionKind::Debit).unwrap(), r#""debit""#);
    }
}
