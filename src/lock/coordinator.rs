//! Lock Coordinator
//!
//! Acquisition and release of wallet locks for both strategies.

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::time::Instant;
use uuid::Uuid;

use crate::ledger::{LedgerError, LedgerStore};

use super::{LockError, LockSettings, LockStrategy};

/// Exclusive access to one wallet.
///
/// For the row-lock strategy this carries no token and the actual lock is
/// taken by [`LockCoordinator::lock_row`]. For the poll strategy it holds the
/// lease token and must be handed back to [`LockCoordinator::release`].
#[derive(Debug)]
#[must_use = "a wallet lease must be released"]
pub struct WalletLease {
    owner_id: Uuid,
    token: Option<Uuid>,
    waited: Duration,
}

impl WalletLease {
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn token(&self) -> Option<Uuid> {
        self.token
    }

    /// Time spent waiting for the lease
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for WalletLease {
    fn drop(&mut self) {
        if let Some(token) = self.token {
            tracing::warn!(
                owner_id = %self.owner_id,
                lock_token = %token,
                "Wallet lease dropped without release; it stays held until it expires"
            );
        }
    }
}

/// Coordinates exclusive access to wallets
#[derive(Debug, Clone)]
pub struct LockCoordinator {
    store: LedgerStore,
    settings: LockSettings,
}

impl LockCoordinator {
    pub fn new(store: LedgerStore, settings: LockSettings) -> Self {
        Self { store, settings }
    }

    // =========================================================================
    // Acquire
    // =========================================================================

    /// Acquire exclusive access to a wallet.
    ///
    /// Row lock: returns immediately, the lock is taken in `lock_row`.
    /// Poll: retries the lease compare-and-swap every `poll_interval` until
    /// it succeeds or `timeout` has elapsed.
    pub async fn acquire(&self, owner_id: Uuid) -> Result<WalletLease, LockError> {
        match self.settings.strategy {
            LockStrategy::RowLock => Ok(WalletLease {
                owner_id,
                token: None,
                waited: Duration::ZERO,
            }),
            LockStrategy::Poll => self.poll_for_lease(owner_id).await,
        }
    }

    async fn poll_for_lease(&self, owner_id: Uuid) -> Result<WalletLease, LockError> {
        let token = Uuid::new_v4();
        let started = Instant::now();
        let deadline = started + self.settings.timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            if self.try_take_lease(owner_id, token, remaining).await? {
                tracing::debug!(
                    owner_id = %owner_id,
                    attempts,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Wallet lease acquired"
                );
                return Ok(WalletLease {
                    owner_id,
                    token: Some(token),
                    waited: started.elapsed(),
                });
            }

            if attempts == 1 && self.store.wallet_status(owner_id).await?.is_none() {
                return Err(LockError::WalletNotFound(owner_id));
            }

            match next_poll_delay(Instant::now(), deadline, self.settings.poll_interval) {
                Some(delay) => {
                    tracing::debug!(owner_id = %owner_id, attempts, "Wallet is locked, waiting");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let waited = started.elapsed();
                    tracing::warn!(
                        owner_id = %owner_id,
                        attempts,
                        waited_ms = waited.as_millis() as u64,
                        "Gave up waiting for wallet lease"
                    );
                    return Err(LockError::Timeout { owner_id, waited });
                }
            }
        }
    }

    /// One compare-and-swap attempt on the lease.
    ///
    /// Exactly one affected row means this caller now holds the lease; zero
    /// means someone else does. The statement itself may queue behind an
    /// in-flight mutation's row lock, so it runs under a local lock_timeout.
    async fn try_take_lease(
        &self,
        owner_id: Uuid,
        token: Uuid,
        remaining: Duration,
    ) -> Result<bool, LockError> {
        let mut tx = self.store.pool().begin().await?;
        set_local_lock_timeout(&mut tx, remaining).await?;

        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET locked = TRUE, lock_token = $2, locked_at = NOW()
            WHERE owner_id = $1
              AND (NOT locked OR locked_at < NOW() - make_interval(secs => $3))
            "#,
        )
        .bind(owner_id)
        .bind(token)
        .bind(self.settings.lease.as_secs_f64())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected() == 1)
            }
            Err(e) => {
                let err = LedgerError::from(e);
                if err.is_lock_timeout() {
                    Ok(false)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    // =========================================================================
    // Lock the balance row inside the mutation transaction
    // =========================================================================

    /// Read the balance under exclusive access, inside `tx`.
    pub async fn lock_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        lease: &WalletLease,
    ) -> Result<Decimal, LockError> {
        set_local_lock_timeout(tx, self.settings.timeout).await?;

        let started = Instant::now();
        self.store
            .lock_balance(tx, lease.owner_id, lease.token)
            .await
            .map_err(|e| match e {
                e if e.is_lock_timeout() => {
                    tracing::warn!(
                        owner_id = %lease.owner_id,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Timed out waiting for wallet row lock"
                    );
                    LockError::Timeout {
                        owner_id: lease.owner_id,
                        waited: started.elapsed(),
                    }
                }
                LedgerError::WalletNotFound(id) => LockError::WalletNotFound(id),
                LedgerError::LeaseLost(id) => LockError::LeaseLost(id),
                other => LockError::Ledger(other),
            })
    }

    /// Take the wallet row lock ahead of removing its owner.
    ///
    /// Orders the removal against any mutation already holding the row: the
    /// caller sees that mutation's committed history. Returns `false` when
    /// the owner has no wallet.
    pub async fn lock_for_removal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner_id: Uuid,
    ) -> Result<bool, LockError> {
        let lease = WalletLease {
            owner_id,
            token: None,
            waited: Duration::ZERO,
        };

        match self.lock_row(tx, &lease).await {
            Ok(_) => Ok(true),
            Err(LockError::WalletNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Release
    // =========================================================================

    /// Release a lease. Row locks need nothing here; poll leases are cleared
    /// only if still held by this lease's token.
    ///
    /// Release failures are logged, not returned: an unreleased lease expires
    /// after `lease` and is reclaimed.
    pub async fn release(&self, mut lease: WalletLease) {
        let Some(token) = lease.token.take() else {
            return;
        };

        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET locked = FALSE, lock_token = NULL, locked_at = NULL
            WHERE owner_id = $1 AND lock_token = $2
            "#,
        )
        .bind(lease.owner_id)
        .bind(token)
        .execute(self.store.pool())
        .await;

        match result {
            Ok(done) if done.rows_affected() == 1 => {
                tracing::debug!(owner_id = %lease.owner_id, "Wallet lease released");
            }
            Ok(_) => {
                tracing::warn!(
                    owner_id = %lease.owner_id,
                    lock_token = %token,
                    "Wallet lease was already taken over before release"
                );
            }
            Err(e) => {
                tracing::error!(
                    owner_id = %lease.owner_id,
                    error = %e,
                    "Failed to release wallet lease; it will expire"
                );
            }
        }
    }
}

/// Clear poll leases older than `lease`.
///
/// Returns the number of wallets unlocked.
pub async fn release_expired_leases(pool: &PgPool, lease: Duration) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE wallets
        SET locked = FALSE, lock_token = NULL, locked_at = NULL
        WHERE locked AND locked_at < NOW() - make_interval(secs => $1)
        "#,
    )
    .bind(lease.as_secs_f64())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Bound every lock wait of the current transaction
async fn set_local_lock_timeout(
    tx: &mut Transaction<'_, Postgres>,
    timeout: Duration,
) -> Result<(), sqlx::Error> {
    // 0 would mean "wait forever"
    let millis = timeout.as_millis().max(1);

    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{millis}ms"))
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Delay before the next poll, or `None` once the deadline has passed.
fn next_poll_delay(now: Instant, deadline: Instant, interval: Duration) -> Option<Duration> {
    if now >= deadline {
        return None;
    }
    Some(interval.min(deadline - now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_poll_delay_uses_interval() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(10);
        assert_eq!(
            next_poll_delay(now, deadline, Duration::from_secs(1)),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_next_poll_delay_is_clamped_to_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_millis(300);
        assert_eq!(
            next_poll_delay(now, deadline, Duration::from_secs(1)),
            Some(Duration::from_millis(300))
        );
    }

    #[test]
    fn test_next_poll_delay_after_deadline() {
        let now = Instant::now();
        assert_eq!(next_poll_delay(now, now, Duration::from_secs(1)), None);
        assert_eq!(
            next_poll_delay(now + Duration::from_millis(1), now, Duration::from_secs(1)),
            None
        );
    }

    #[test]
    fn test_row_lock_lease_has_no_token() {
        let lease = WalletLease {
            owner_id: Uuid::nil(),
            token: None,
            waited: Duration::ZERO,
        };
        assert!(lease.token().is_none());
        assert_eq!(lease.waited(), Duration::ZERO);
    }
}
