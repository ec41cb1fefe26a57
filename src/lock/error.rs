//! Lock Errors

use std::time::Duration;
use uuid::Uuid;

use crate::ledger::LedgerError;

/// Errors that can occur while acquiring or using a wallet lock
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock could not be obtained within the configured bound
    #[error("Timed out after {waited:?} waiting for the wallet lock of {owner_id}")]
    Timeout { owner_id: Uuid, waited: Duration },

    /// The lease expired and was taken over before the mutation finished
    #[error("Wallet lock lease for {0} was lost")]
    LeaseLost(Uuid),

    /// No wallet row to lock
    #[error("Wallet not found for owner {0}")]
    WalletNotFound(Uuid),

    /// Storage failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<sqlx::Error> for LockError {
    fn from(err: sqlx::Error) -> Self {
        LockError::Ledger(LedgerError::Database(err))
    }
}
