//! Transaction Handler
//!
//! Entry point for credit and debit requests. Rejects malformed input
//! before any lock is taken, then hands the mutation to the mutator.

use sqlx::PgPool;

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::lock::LockSettings;
use crate::wallet::{BalanceMutator, MutationOutcome};

use super::MutationCommand;

/// Handler for balance mutations
pub struct TransactionHandler {
    mutator: BalanceMutator,
}

impl TransactionHandler {
    pub fn new(pool: PgPool, settings: LockSettings) -> Self {
        Self {
            mutator: BalanceMutator::new(pool, settings),
        }
    }

    /// Execute the mutation command
    pub async fn execute(
        &self,
        command: MutationCommand,
        context: &OperationContext,
    ) -> Result<MutationOutcome, AppError> {
        let (kind, amount) = command.validate()?;

        tracing::debug!(
            request_id = ?context.request_id,
            user_id = %command.user_id,
            kind = %kind,
            amount = %amount,
            "Processing balance mutation"
        );

        Ok(self
            .mutator
            .mutate(command.user_id, kind, amount, context)
            .await?)
    }
}
