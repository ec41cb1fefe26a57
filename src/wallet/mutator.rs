//! Balance Mutator
//!
//! One parameterized code path for credits and debits:
//! lookup owner → acquire lock → (read balance, plan, write balance, append
//! audit record, commit) → release lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Amount, Balance, DomainError, OperationContext, TransactionKind};
use crate::ledger::{LedgerError, LedgerStore, NewAuditRecord, Owner};
use crate::lock::{LockCoordinator, LockSettings, WalletLease};

use super::MutationError;

/// Result of a committed mutation
#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome {
    pub transaction_id: Uuid,
    pub owner_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub new_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Compute the balance after applying `kind` of `amount` to `current`.
///
/// Debits may bring the balance to exactly zero but never below it.
pub fn plan_balance(
    current: Balance,
    kind: TransactionKind,
    amount: &Amount,
) -> Result<Balance, DomainError> {
    match kind {
        TransactionKind::Credit => Ok(current.credit(amount)?),
        TransactionKind::Debit => {
            if !current.is_sufficient_for(amount) {
                return Err(DomainError::insufficient_funds(amount.value(), current.value()));
            }
            Ok(current.debit(amount)?)
        }
    }
}

/// Applies balance mutations under the wallet lock
#[derive(Debug, Clone)]
pub struct BalanceMutator {
    store: LedgerStore,
    locks: LockCoordinator,
}

impl BalanceMutator {
    pub fn new(pool: PgPool, settings: LockSettings) -> Self {
        let store = LedgerStore::new(pool);
        Self {
            locks: LockCoordinator::new(store.clone(), settings),
            store,
        }
    }

    /// Atomically apply the mutation and append its audit record, or do
    /// neither.
    pub async fn mutate(
        &self,
        owner_id: Uuid,
        kind: TransactionKind,
        amount: Amount,
        context: &OperationContext,
    ) -> Result<MutationOutcome, MutationError> {
        let owner = self
            .store
            .find_owner(owner_id)
            .await?
            .ok_or(MutationError::NotFound(owner_id))?;

        let lease = self.locks.acquire(owner_id).await?;
        let result = self.apply(&owner, &lease, kind, amount).await;
        self.locks.release(lease).await;

        match &result {
            Ok(outcome) => tracing::info!(
                request_id = ?context.request_id,
                owner_id = %owner_id,
                kind = %kind,
                amount = %amount,
                new_balance = %outcome.new_balance,
                transaction_id = %outcome.transaction_id,
                "Balance mutation committed"
            ),
            Err(MutationError::Persistence(e)) => tracing::error!(
                request_id = ?context.request_id,
                owner_id = %owner_id,
                kind = %kind,
                error = %e,
                "Balance mutation rolled back"
            ),
            Err(e) => tracing::warn!(
                request_id = ?context.request_id,
                owner_id = %owner_id,
                kind = %kind,
                amount = %amount,
                error = %e,
                "Balance mutation rejected"
            ),
        }

        result
    }

    /// The atomic unit. Any early return drops `tx`, which rolls it back.
    async fn apply(
        &self,
        owner: &Owner,
        lease: &WalletLease,
        kind: TransactionKind,
        amount: Amount,
    ) -> Result<MutationOutcome, MutationError> {
        let mut tx = self.store.pool().begin().await?;

        let stored = self.locks.lock_row(&mut tx, lease).await?;
        let current = Balance::new(stored).map_err(|_| {
            MutationError::Persistence(LedgerError::CorruptBalance {
                owner_id: owner.id,
                value: stored,
            })
        })?;

        // A delete that ran while this mutation queued for the row wins
        let owner = self
            .store
            .lock_owner(&mut tx, owner.id)
            .await?
            .ok_or(MutationError::NotFound(owner.id))?;

        let new_balance = plan_balance(current, kind, &amount)?;

        self.store
            .set_balance(&mut tx, owner.id, new_balance, lease.token())
            .await?;

        let record = self
            .store
            .append_record(
                &mut tx,
                NewAuditRecord {
                    user_id: owner.id,
                    user_name: owner.username.clone(),
                    kind,
                    amount,
                    balance_after: new_balance,
                },
            )
            .await?;

        tx.commit().await?;

        Ok(MutationOutcome {
            transaction_id: record.id,
            owner_id: owner.id,
            kind,
            amount: record.amount,
            previous_balance: current.value(),
            new_balance: new_balance.value(),
            created_at: record.created_at,
        })
    }
}
