//! Ledger Errors
//!
//! Error types for ledger store operations.

use uuid::Uuid;

/// PostgreSQL SQLSTATE raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// PostgreSQL SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// No wallet row for this owner
    #[error("Wallet not found for owner {0}")]
    WalletNotFound(Uuid),

    /// A token-guarded write found the lease held by someone else
    #[error("Wallet lock lease lost for owner {0}")]
    LeaseLost(Uuid),

    /// A stored balance violates the non-negative invariant
    #[error("Stored balance {value} for owner {owner_id} is invalid")]
    CorruptBalance {
        owner_id: Uuid,
        value: rust_decimal::Decimal,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    /// Check if the database gave up waiting for a row lock
    pub fn is_lock_timeout(&self) -> bool {
        self.has_sqlstate(LOCK_NOT_AVAILABLE)
    }

    /// Check if a unique constraint rejected the write
    pub fn is_unique_violation(&self) -> bool {
        self.has_sqlstate(UNIQUE_VIOLATION)
    }

    fn has_sqlstate(&self, code: &str) -> bool {
        match self {
            LedgerError::Database(sqlx::Error::Database(db)) => db.code().as_deref() == Some(code),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_lock_timeouts() {
        assert!(!LedgerError::WalletNotFound(Uuid::nil()).is_lock_timeout());
        assert!(!LedgerError::LeaseLost(Uuid::nil()).is_lock_timeout());
        assert!(!LedgerError::Database(sqlx::Error::RowNotFound).is_lock_timeout());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::WalletNotFound(Uuid::nil());
        assert!(err.to_string().contains("Wallet not found"));
    }
}
