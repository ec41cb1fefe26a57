//! Mutation Errors

use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::ledger::LedgerError;
use crate::lock::LockError;

/// Every way a balance mutation can fail.
///
/// None of these leaves a partial write behind: the transaction is rolled
/// back and any lease released before the error reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Bad input shape or value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown owner or missing wallet
    #[error("Owner not found: {0}")]
    NotFound(Uuid),

    /// Debit larger than the balance
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    /// The wallet lock could not be obtained in time
    #[error("Wallet {owner_id} is busy; gave up after {waited:?}")]
    LockTimeout { owner_id: Uuid, waited: Duration },

    /// Storage failure inside the atomic unit
    #[error("Persistence failure: {0}")]
    Persistence(#[source] LedgerError),
}

impl MutationError {
    /// Safe to retry later without any risk of double-applying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MutationError::LockTimeout { .. } | MutationError::Persistence(_)
        )
    }
}

impl From<DomainError> for MutationError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientFunds {
                required,
                available,
            } => MutationError::InsufficientFunds {
                required,
                available,
            },
            other => MutationError::Validation(other.to_string()),
        }
    }
}

impl From<LedgerError> for MutationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::WalletNotFound(id) => MutationError::NotFound(id),
            LedgerError::LeaseLost(owner_id) => MutationError::LockTimeout {
                owner_id,
                waited: Duration::ZERO,
            },
            other => MutationError::Persistence(other),
        }
    }
}

impl From<sqlx::Error> for MutationError {
    fn from(err: sqlx::Error) -> Self {
        MutationError::Persistence(LedgerError::Database(err))
    }
}

impl From<LockError> for MutationError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { owner_id, waited } => {
                MutationError::LockTimeout { owner_id, waited }
            }
            LockError::LeaseLost(owner_id) => MutationError::LockTimeout {
                owner_id,
                waited: Duration::ZERO,
            },
            LockError::WalletNotFound(id) => MutationError::NotFound(id),
            LockError::Ledger(e) => e.into(),
        }
    }
}
