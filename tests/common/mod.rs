//! Common test utilities
//!
//! Tests share one database and run in parallel, so nothing is truncated:
//! every test works on users it created itself.

#![allow(dead_code)]

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use wallet_ledger::handlers::{CreateUserCommand, UserHandler};
use wallet_ledger::{LockSettings, LockStrategy, OperationContext};

/// Connect and bring the schema up to date
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    wallet_ledger::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// An email no other test uses
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}.{}@example.com", Uuid::new_v4().simple())
}

/// Create a user with an empty wallet
pub async fn create_user(pool: &PgPool, username: &str) -> Uuid {
    UserHandler::new(pool.clone(), LockSettings::default())
        .create(
            CreateUserCommand::new(username, "Test", "User", unique_email("user")),
            &OperationContext::new(),
        )
        .await
        .expect("Failed to create user")
        .id
}

/// Short bounds so contention tests finish quickly
pub fn lock_settings(strategy: LockStrategy) -> LockSettings {
    LockSettings::default()
        .with_strategy(strategy)
        .with_timeout(Duration::from_secs(5))
        .with_poll_interval(Duration::from_millis(10))
        .with_lease(Duration::from_secs(30))
}

/// Make the audit insert fail for users named `username`
pub async fn reject_audit_records_for(pool: &PgPool, username: &str) {
    sqlx::query(&format!(
        r#"
        CREATE OR REPLACE FUNCTION reject_test_audit_record() RETURNS trigger AS $$
        BEGIN
            IF NEW.user_name = '{username}' THEN
                RAISE EXCEPTION 'audit record rejected for %', NEW.user_name;
            END IF;
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql
        "#
    ))
    .execute(pool)
    .await
    .expect("Failed to create audit rejection function");

    sqlx::query(
        r#"
        DO $$
        BEGIN
            IF NOT EXISTS (SELECT 1 FROM pg_trigger WHERE tgname = 'reject_test_audit_record') THEN
                CREATE TRIGGER reject_test_audit_record
                    BEFORE INSERT ON transactions
                    FOR EACH ROW EXECUTE FUNCTION reject_test_audit_record();
            END IF;
        END;
        $$
        "#,
    )
    .execute(pool)
    .await
    .expect("Failed to install audit rejection trigger");
}

/// Pretend another process holds the poll lease, taken `age` ago
pub async fn hold_lease(pool: &PgPool, owner_id: Uuid, age: Duration) {
    sqlx::query(
        r#"
        UPDATE wallets
        SET locked = TRUE, lock_token = $2, locked_at = NOW() - make_interval(secs => $3)
        WHERE owner_id = $1
        "#,
    )
    .bind(owner_id)
    .bind(Uuid::new_v4())
    .bind(age.as_secs_f64())
    .execute(pool)
    .await
    .expect("Failed to plant lease");
}
