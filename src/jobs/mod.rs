//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks: clearing abandoned poll
//! leases and checking that every wallet balance still matches its history.

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;
use uuid::Uuid;

use crate::lock::release_expired_leases;

// =========================================================================
// Expired Lease Reaper
// =========================================================================

/// Unlock wallets whose poll lease is older than `lease`.
///
/// A holder that crashed never releases its lease; acquirers can already
/// take over an expired lease, this just makes the wallet state honest.
pub async fn release_expired_wallet_locks(pool: &PgPool, lease: Duration) -> Result<u64, JobError> {
    let released = release_expired_leases(pool, lease).await?;

    if released > 0 {
        tracing::warn!(
            wallets_released = released,
            lease_secs = lease.as_secs(),
            "Released expired wallet leases"
        );
    }

    Ok(released)
}

// =========================================================================
// Reconciliation Audit
// =========================================================================

/// A wallet whose balance differs from the net of its audit records
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Discrepancy {
    pub owner_id: Uuid,
    pub balance: Decimal,
    pub net: Decimal,
}

/// Find wallets whose balance does not equal credits minus debits.
///
/// One statement, so balances and sums come from the same snapshot.
pub async fn find_unreconciled_wallets(pool: &PgPool) -> Result<Vec<Discrepancy>, JobError> {
    let discrepancies = sqlx::query_as::<_, Discrepancy>(
        r#"
        SELECT w.owner_id,
               w.balance,
               COALESCE(SUM(CASE WHEN t.kind = 'credit' THEN t.amount ELSE -t.amount END), 0) AS net
        FROM wallets w
        LEFT JOIN transactions t ON t.user_id = w.owner_id
        GROUP BY w.owner_id, w.balance
        HAVING w.balance <> COALESCE(SUM(CASE WHEN t.kind = 'credit' THEN t.amount ELSE -t.amount END), 0)
        "#,
    )
    .fetch_all(pool)
    .await?;

    for d in &discrepancies {
        tracing::error!(
            owner_id = %d.owner_id,
            balance = %d.balance,
            net = %d.net,
            "Wallet balance does not match its transaction history"
        );
    }

    Ok(discrepancies)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the lease reaper (default: 15 seconds)
    pub lease_reaper_interval: Duration,
    /// Age after which a lease is reaped (default: 30 seconds)
    pub lease: Duration,
    /// Interval for the reconciliation audit (default: 10 minutes)
    pub reconciliation_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            lease_reaper_interval: Duration::from_secs(15),
            lease: Duration::from_secs(30),
            reconciliation_interval: Duration::from_secs(600),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create with custom configuration
    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!(
            lease_reaper_interval_secs = self.config.lease_reaper_interval.as_secs(),
            reconciliation_interval_secs = self.config.reconciliation_interval.as_secs(),
            "Job scheduler started"
        );

        let mut reaper_interval = interval(self.config.lease_reaper_interval);
        let mut reconciliation_interval = interval(self.config.reconciliation_interval);

        loop {
            tokio::select! {
                _ = reaper_interval.tick() => {
                    if let Err(e) = release_expired_wallet_locks(&self.pool, self.config.lease).await {
                        tracing::error!(error = %e, "Lease reaper failed");
                    }
                }
                _ = reconciliation_interval.tick() => {
                    if let Err(e) = find_unreconciled_wallets(&self.pool).await {
                        tracing::error!(error = %e, "Reconciliation audit failed");
                    }
                }
            }
        }
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =========================================================================
// Tests
// =========================================================================
