//! Ledger Store Repository
//!
//! PostgreSQL persistence for wallets and transactions. Writes that belong to
//! a balance mutation take the caller's transaction so the mutator decides
//! when the unit commits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Amount, Balance, TransactionKind};

use super::LedgerError;

/// Identity of a wallet owner, as needed by the mutator
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Owner {
    pub id: Uuid,
    pub username: String,
}

/// Current wallet row, including the poll-lock state
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WalletStatus {
    pub owner_id: Uuid,
    pub balance: Decimal,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable audit record of one balance mutation
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Audit record about to be appended
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub user_id: Uuid,
    pub user_name: String,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub balance_after: Balance,
}

/// Count and sum of audit records of one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub count: i64,
    pub amount: Decimal,
}

/// Per-kind aggregate of an owner's audit records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub credit: KindTotals,
    pub debit: KindTotals,
}

impl LedgerSummary {
    /// Fold `(kind, count, sum)` rows into a summary
    pub fn from_rows(rows: impl IntoIterator<Item = (String, i64, Decimal)>) -> Self {
        let mut summary = Self::default();
        for (kind, count, amount) in rows {
            let totals = match kind.parse::<TransactionKind>() {
                Ok(TransactionKind::Credit) => &mut summary.credit,
                Ok(TransactionKind::Debit) => &mut summary.debit,
                Err(_) => {
                    tracing::warn!(kind = %kind, "Ignoring unknown transaction kind in aggregate");
                    continue;
                }
            };
            totals.count += count;
            totals.amount += amount;
        }
        summary
    }

    pub fn total_count(&self) -> i64 {
        self.credit.count + self.debit.count
    }

    /// Signed sum: credits add, debits subtract
    pub fn net(&self) -> Decimal {
        self.credit.amount - self.debit.amount
    }
}

/// Balance and history aggregate read from one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub balance: Decimal,
    pub summary: LedgerSummary,
}

impl Reconciliation {
    /// Wallets start at zero, so the history must sum to the balance
    pub fn is_reconciled(&self) -> bool {
        self.summary.net() == self.balance
    }
}

/// Ledger Store for balances and audit records
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: PgPool,
}

impl LedgerStore {
    /// Create a new LedgerStore with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    // Identity lookups
    // =========================================================================

    /// Look up the owner of a wallet
    pub async fn find_owner(&self, owner_id: Uuid) -> Result<Option<Owner>, LedgerError> {
        let owner = sqlx::query_as::<_, Owner>("SELECT id, username FROM users WHERE id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    /// Re-read the owner inside `tx` and keep it from being deleted until
    /// `tx` ends
    pub async fn lock_owner(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
    ) -> Result<Option<Owner>, LedgerError> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, username FROM users WHERE id = $1 FOR SHARE",
        )
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(owner)
    }

    // =========================================================================
    // Wallet provisioning
    // =========================================================================

    /// Create a zero-balance wallet for a new owner
    pub async fn create_wallet(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (owner_id, balance, locked)
            VALUES ($1, 0, FALSE)
            ON CONFLICT (owner_id) DO NOTHING
            "#,
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Delete a wallet only if no audit record references it and no poll
    /// lease is held on it.
    ///
    /// The caller must already hold the row lock, so the history check sees
    /// every mutation committed before it. Returns whether the wallet row
    /// was removed.
    pub async fn delete_wallet_if_unused(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
    ) -> Result<bool, LedgerError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM wallets
            WHERE owner_id = $1
              AND NOT locked
              AND NOT EXISTS (SELECT 1 FROM transactions WHERE user_id = $1)
            "#,
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    // =========================================================================
    // Balance reads and writes
    // =========================================================================

    /// Current wallet state, without taking any lock
    pub async fn wallet_status(&self, owner_id: Uuid) -> Result<Option<WalletStatus>, LedgerError> {
        let status = sqlx::query_as::<_, WalletStatus>(
            r#"
            SELECT owner_id, balance, locked, locked_at, created_at, updated_at
            FROM wallets
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(status)
    }

    /// Read the balance and hold the row lock until `tx` ends.
    ///
    /// With a lease token the row must still be leased to that token,
    /// otherwise `LeaseLost` is returned.
    pub async fn lock_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        lease_token: Option<Uuid>,
    ) -> Result<Decimal, LedgerError> {
        let balance: Option<Decimal> = match lease_token {
            None => {
                sqlx::query_scalar("SELECT balance FROM wallets WHERE owner_id = $1 FOR UPDATE")
                    .bind(owner_id)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            Some(token) => {
                sqlx::query_scalar(
                    r#"
                    SELECT balance FROM wallets
                    WHERE owner_id = $1 AND locked AND lock_token = $2
                    FOR UPDATE
                    "#,
                )
                .bind(owner_id)
                .bind(token)
                .fetch_optional(&mut **tx)
                .await?
            }
        };

        balance.ok_or(match lease_token {
            None => LedgerError::WalletNotFound(owner_id),
            Some(_) => LedgerError::LeaseLost(owner_id),
        })
    }

    /// Overwrite the balance inside the caller's transaction
    pub async fn set_balance(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
        balance: Balance,
        lease_token: Option<Uuid>,
    ) -> Result<(), LedgerError> {
        let rows = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $2, updated_at = NOW()
            WHERE owner_id = $1
              AND ($3::uuid IS NULL OR (locked AND lock_token = $3))
            "#,
        )
        .bind(owner_id)
        .bind(balance.value())
        .bind(lease_token)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(match lease_token {
                None => LedgerError::WalletNotFound(owner_id),
                Some(_) => LedgerError::LeaseLost(owner_id),
            });
        }

        Ok(())
    }

    // =========================================================================
    // Audit records
    // =========================================================================

    /// Append one audit record inside the caller's transaction
    pub async fn append_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: NewAuditRecord,
    ) -> Result<AuditRecord, LedgerError> {
        let stored = sqlx::query_as::<_, AuditRecord>(
            r#"
            INSERT INTO transactions (id, user_id, user_name, kind, amount, balance_after)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, user_name, kind, amount, balance_after, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(&record.user_name)
        .bind(record.kind.as_str())
        .bind(record.amount.value())
        .bind(record.balance_after.value())
        .fetch_one(&mut **tx)
        .await?;

        Ok(stored)
    }

    /// All audit records for an owner, most recent first
    pub async fn list_records(&self, owner_id: Uuid) -> Result<Vec<AuditRecord>, LedgerError> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, user_id, user_name, kind, amount, balance_after, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY seq DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// All audit records for an owner in the order they were applied
    pub async fn statement(&self, owner_id: Uuid) -> Result<Vec<AuditRecord>, LedgerError> {
        let records = sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, user_id, user_name, kind, amount, balance_after, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Count and sum of audit records per kind
    pub async fn aggregate(&self, owner_id: Uuid) -> Result<LedgerSummary, LedgerError> {
        Self::aggregate_with(&self.pool, owner_id).await
    }

    /// Balance and aggregate read from a single REPEATABLE READ snapshot.
    ///
    /// Returns `None` if the owner has no wallet.
    pub async fn reconciliation(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<Reconciliation>, LedgerError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(balance) = balance else {
            return Ok(None);
        };

        let summary = Self::aggregate_with(&mut *tx, owner_id).await?;
        tx.commit().await?;

        Ok(Some(Reconciliation { balance, summary }))
    }

    async fn aggregate_with<'e, E>(executor: E, owner_id: Uuid) -> Result<LedgerSummary, LedgerError>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(String, i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT kind, COUNT(*), COALESCE(SUM(amount), 0)
            FROM transactions
            WHERE user_id = $1
            GROUP BY kind
            "#,
        )
        .bind(owner_id)
        .fetch_all(executor)
        .await?;

        Ok(LedgerSummary::from_rows(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_from_rows() {
        let summary = LedgerSummary::from_rows(vec![
            ("credit".to_string(), 3, dec!(150)),
            ("debit".to_string(), 2, dec!(40.5)),
        ]);

        assert_eq!(summary.credit, KindTotals { count: 3, amount: dec!(150) });
        assert_eq!(summary.debit, KindTotals { count: 2, amount: dec!(40.5) });
        assert_eq!(summary.total_count(), 5);
        assert_eq!(summary.net(), dec!(109.5));
    }

    #[test]
    fn test_summary_without_history_is_zero() {
        let summary = LedgerSummary::from_rows(Vec::new());
        assert_eq!(summary.total_count(), 0);
        assert_eq!(summary.net(), Decimal::ZERO);
    }

    #[test]
    fn test_summary_ignores_unknown_kinds() {
        let summary = LedgerSummary::from_rows(vec![("refund".to_string(), 1, dec!(10))]);
        assert_eq!(summary, LedgerSummary::default());
    }

    #[test]
    fn test_reconciliation() {
        let summary = LedgerSummary::from_rows(vec![
            ("credit".to_string(), 1, dec!(100)),
            ("debit".to_string(), 1, dec!(100)),
        ]);

        assert!(Reconciliation { balance: Decimal::ZERO, summary }.is_reconciled());
        assert!(!Reconciliation { balance: dec!(1), summary }.is_reconciled());
    }
}
