//! Command Handlers module
//!
//! Handlers that validate commands and orchestrate the wallet and ledger
//! layers. Each handler is cheap to construct per request.

mod commands;
mod transaction_handler;
mod user_handler;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use transaction_handler::TransactionHandler;
pub use user_handler::UserHandler;
