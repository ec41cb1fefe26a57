//! User Handler
//!
//! User lifecycle. Creating a user provisions its zero-balance wallet in the
//! same transaction; deleting a user never removes its transaction history.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::OperationContext;
use crate::error::AppError;
use crate::ledger::{LedgerError, LedgerStore};
use crate::lock::{LockCoordinator, LockSettings};
use crate::wallet::MutationError;

use super::{CreateUserCommand, DeleteUserResult, UpdateUserCommand, UserDetails, UserRecord};

/// Handler for user commands and lookups
pub struct UserHandler {
    store: LedgerStore,
    locks: LockCoordinator,
    pool: PgPool,
}

impl UserHandler {
    pub fn new(pool: PgPool, settings: LockSettings) -> Self {
        let store = LedgerStore::new(pool.clone());
        Self {
            locks: LockCoordinator::new(store.clone(), settings),
            store,
            pool,
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Create a user and its wallet atomically
    pub async fn create(
        &self,
        command: CreateUserCommand,
        context: &OperationContext,
    ) -> Result<UserRecord, AppError> {
        command.validate()?;

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, fname, lname, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, username, fname, lname, email, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&command.username)
        .bind(&command.fname)
        .bind(&command.lname)
        .bind(&command.email)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_or(e, &command.email))?;

        self.store.create_wallet(&mut tx, user.id).await?;

        tx.commit().await?;

        tracing::info!(
            request_id = ?context.request_id,
            user_id = %user.id,
            username = %user.username,
            "User created with empty wallet"
        );

        Ok(user)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// User row plus wallet balance and transaction count
    pub async fn get(&self, user_id: Uuid) -> Result<UserDetails, AppError> {
        let user = self.find(user_id).await?;

        let balance = self
            .store
            .wallet_status(user_id)
            .await?
            .map(|w| w.balance)
            .unwrap_or(Decimal::ZERO);
        let total_transactions = self.store.aggregate(user_id).await?.total_count();

        Ok(UserDetails {
            user,
            balance,
            total_transactions,
        })
    }

    async fn find(&self, user_id: Uuid) -> Result<UserRecord, AppError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, fname, lname, email, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Replace the identity fields of an existing user
    pub async fn update(
        &self,
        command: UpdateUserCommand,
        context: &OperationContext,
    ) -> Result<UserRecord, AppError> {
        command.validate()?;

        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET username = $2, fname = $3, lname = $4, email = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, username, fname, lname, email, created_at, updated_at
            "#,
        )
        .bind(command.user_id)
        .bind(&command.username)
        .bind(&command.fname)
        .bind(&command.lname)
        .bind(&command.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or(e, &command.email))?
        .ok_or_else(|| AppError::UserNotFound(command.user_id.to_string()))?;

        tracing::info!(
            request_id = ?context.request_id,
            user_id = %user.id,
            "User updated"
        );

        Ok(user)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a user. Its transactions stay; its wallet goes only if unused.
    ///
    /// The wallet row is locked first, the same order a mutation takes its
    /// locks in, so a mutation in flight either commits before the delete
    /// looks at the history or finds the user gone.
    pub async fn delete(
        &self,
        user_id: Uuid,
        context: &OperationContext,
    ) -> Result<DeleteUserResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let has_wallet = self
            .locks
            .lock_for_removal(&mut tx, user_id)
            .await
            .map_err(MutationError::from)?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::UserNotFound(user_id.to_string()));
        }

        let wallet_removed =
            has_wallet && self.store.delete_wallet_if_unused(&mut tx, user_id).await?;

        tx.commit().await?;

        tracing::info!(
            request_id = ?context.request_id,
            user_id = %user_id,
            wallet_removed,
            "User deleted"
        );

        Ok(DeleteUserResult {
            user_id,
            wallet_removed,
            message: "User deleted successfully; transaction history retained".to_string(),
        })
    }
}

/// Map a unique violation to 409, anything else to a database error
fn conflict_or(err: sqlx::Error, email: &str) -> AppError {
    let err = LedgerError::from(err);
    if err.is_unique_violation() {
        AppError::UserExists(format!("email {email} is already registered"))
    } else {
        AppError::from(err)
    }
}
