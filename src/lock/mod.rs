//! Wallet lock module
//!
//! Grants exclusive access to one wallet for the duration of one balance
//! mutation. Two strategies share the same `wallets` row:
//!
//! - `RowLock`: `SELECT ... FOR UPDATE` inside the mutation transaction,
//!   bounded by a transaction-local `lock_timeout`. Release is implicit on
//!   commit or rollback.
//! - `Poll`: a persisted lease (`locked`, `lock_token`, `locked_at`) taken by
//!   a compare-and-swap that is retried on an interval until a maximum wait.
//!   Writes under the lease are guarded by its token and expired leases can
//!   be taken over, so a crashed holder never strands a wallet.

mod coordinator;
mod error;
mod settings;

pub use coordinator::{release_expired_leases, LockCoordinator, WalletLease};
pub use error::LockError;
pub use settings::{LockSettings, LockStrategy};
