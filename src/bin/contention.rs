//! Contention Tool
//!
//! Fires concurrent credits and debits at a single wallet and checks that the
//! final balance equals the net of the mutations that succeeded.
//!
//! Run with: cargo run --bin contention --release -- --workers 16 --ops 50 --strategy poll

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

use wallet_ledger::handlers::{CreateUserCommand, UserHandler};
use wallet_ledger::ledger::LedgerStore;
use wallet_ledger::{
    db, Amount, BalanceMutator, Config, LockStrategy, MutationError, OperationContext,
    TransactionKind,
};

/// Per-worker tally
#[derive(Debug, Default)]
struct Tally {
    net: Decimal,
    committed: u64,
    insufficient: u64,
    timed_out: u64,
    failed: u64,
}

fn arg<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> T {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_ledger=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let workers: u32 = arg(&args, "--workers", 16);
    let ops: u32 = arg(&args, "--ops", 50);
    let strategy: LockStrategy = arg(&args, "--strategy", LockStrategy::RowLock);

    let config = Config::from_env()?;
    let settings = config.lock_settings().with_strategy(strategy);

    println!("Contention Test - {workers} workers x {ops} ops, strategy={strategy}");
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(workers + 4)
        .connect(&config.database_url)
        .await?;
    db::run_migrations(&pool).await?;

    let context = OperationContext::new();
    let user = UserHandler::new(pool.clone(), settings.clone())
        .create(
            CreateUserCommand::new(
                "Contention Owner",
                "Load",
                "Tester",
                format!("contention-{}@example.com", uuid::Uuid::new_v4().simple()),
            ),
            &context,
        )
        .await?;

    let mutator = Arc::new(BalanceMutator::new(pool.clone(), settings));
    let start = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let mutator = Arc::clone(&mutator);
            let owner_id = user.id;
            tokio::spawn(async move {
                let mut tally = Tally::default();
                let context = OperationContext::new().with_request_id(uuid::Uuid::new_v4());

                for op in 0..ops {
                    // Two credits for every debit, debits slightly larger
                    let (kind, units) = if (worker + op) % 3 == 0 {
                        (TransactionKind::Debit, 15 + i64::from(op % 7))
                    } else {
                        (TransactionKind::Credit, 10 + i64::from(worker % 5))
                    };
                    let amount = Amount::from_integer(units)?;

                    match mutator.mutate(owner_id, kind, amount, &context).await {
                        Ok(_) => {
                            tally.committed += 1;
                            tally.net += match kind {
                                TransactionKind::Credit => amount.value(),
                                TransactionKind::Debit => -amount.value(),
                            };
                        }
                        Err(MutationError::InsufficientFunds { .. }) => tally.insufficient += 1,
                        Err(MutationError::LockTimeout { .. }) => tally.timed_out += 1,
                        Err(_) => tally.failed += 1,
                    }
                }

                Ok::<_, wallet_ledger::AmountError>(tally)
            })
        })
        .collect();

    let mut total = Tally::default();
    for handle in handles {
        let tally = handle.await??;
        total.net += tally.net;
        total.committed += tally.committed;
        total.insufficient += tally.insufficient;
        total.timed_out += tally.timed_out;
        total.failed += tally.failed;
    }

    let elapsed = start.elapsed();

    let store = LedgerStore::new(pool.clone());
    let snapshot = store
        .reconciliation(user.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("wallet for {} disappeared", user.id))?;

    println!("\n=== Contention Test Results ===");
    println!("Committed: {}", total.committed);
    println!("Insufficient funds: {}", total.insufficient);
    println!("Lock timeouts: {}", total.timed_out);
    println!("Other failures: {}", total.failed);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} committed/sec",
        total.committed as f64 / elapsed.as_secs_f64()
    );
    println!("Expected balance: {}", total.net);
    println!("Stored balance: {}", snapshot.balance);
    println!("History net: {}", snapshot.summary.net());

    if snapshot.balance != total.net || !snapshot.is_reconciled() {
        anyhow::bail!("balance does not reconcile with committed mutations");
    }
    if snapshot.summary.total_count() != total.committed as i64 {
        anyhow::bail!(
            "{} audit records for {} committed mutations",
            snapshot.summary.total_count(),
            total.committed
        );
    }

    println!("OK: balance reconciles");
    Ok(())
}
