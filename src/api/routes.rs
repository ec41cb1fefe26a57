//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::JsonRejection, Extension, FromRequest, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{OperationContext, TransactionKind};
use crate::error::AppError;
use crate::handlers::{
    CreateUserCommand, DeleteUserResult, MutationCommand, TransactionHandler, UpdateUserCommand,
    UserDetails, UserHandler, UserRecord,
};
use crate::ledger::{AuditRecord, LedgerStore, LedgerSummary};
use crate::lock::LockSettings;
use crate::wallet::MutationOutcome;

// =========================================================================
// State
// =========================================================================

/// Shared state for all API handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub lock: LockSettings,
}

impl AppState {
    pub fn new(pool: PgPool, lock: LockSettings) -> Self {
        Self { pool, lock }
    }
}

/// JSON extractor that reports body errors as `invalid_request`
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub username: String,
    pub fname: String,
    pub lname: String,
    pub email: String,
}

impl From<UserRequest> for CreateUserCommand {
    fn from(request: UserRequest) -> Self {
        CreateUserCommand::new(request.username, request.fname, request.lname, request.email)
    }
}

/// An amount as sent by clients: a JSON string or a JSON number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(serde_json::Number),
}

impl AmountInput {
    pub fn into_text(self) -> String {
        match self {
            AmountInput::Text(s) => s,
            AmountInput::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: AmountInput,
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    pub user_id: Uuid,
    pub kind: String,
    pub amount: AmountInput,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: MutationOutcome,
}

impl From<MutationOutcome> for MutationResponse {
    fn from(outcome: MutationOutcome) -> Self {
        let verb = match outcome.kind {
            TransactionKind::Credit => "credited",
            TransactionKind::Debit => "debited",
        };
        Self {
            message: format!("Wallet {verb} with {}", outcome.amount),
            outcome,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub user_id: Uuid,
    pub transactions: Vec<AuditRecord>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub total_transactions: i64,
    #[serde(flatten)]
    pub summary: LedgerSummary,
    pub net: Decimal,
    pub reconciled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatementLine {
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub running_balance: Decimal,
    pub recorded_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatementResponse {
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub lines: Vec<StatementLine>,
    pub closing_balance: Decimal,
}

impl StatementResponse {
    /// Fold oldest-first records into lines with a running balance
    pub fn from_records(user_id: Uuid, records: Vec<AuditRecord>) -> Self {
        let user_name = records.last().map(|r| r.user_name.clone());
        let mut running = Decimal::ZERO;

        let lines: Vec<StatementLine> = records
            .into_iter()
            .map(|record| {
                running += match record.kind {
                    TransactionKind::Credit => record.amount,
                    TransactionKind::Debit => -record.amount,
                };
                StatementLine {
                    transaction_id: record.id,
                    kind: record.kind,
                    amount: record.amount,
                    running_balance: running,
                    recorded_balance: record.balance_after,
                    created_at: record.created_at,
                }
            })
            .collect();

        Self {
            user_id,
            user_name,
            lines,
            closing_balance: running,
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Users
        .route("/users", post(create_user))
        .route(
            "/users/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
        // Wallet
        .route("/users/:user_id/wallet", get(get_wallet))
        .route("/users/:user_id/credit", post(credit))
        .route("/users/:user_id/debit", post(debit))
        .route("/transactions", post(create_transaction))
        // History and reports
        .route("/users/:user_id/transactions", get(list_transactions))
        .route("/users/:user_id/transactions/summary", get(transaction_summary))
        .route("/users/:user_id/statement", get(statement))
}

// =========================================================================
// Users
// =========================================================================

/// POST /users
async fn create_user(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<UserRequest>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    let handler = UserHandler::new(state.pool, state.lock);
    let user = handler.create(request.into(), &context).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/:user_id
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserDetails>, AppError> {
    let handler = UserHandler::new(state.pool, state.lock);
    Ok(Json(handler.get(user_id).await?))
}

/// PUT /users/:user_id
async fn update_user(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    ApiJson(request): ApiJson<UserRequest>,
) -> Result<Json<UserRecord>, AppError> {
    let handler = UserHandler::new(state.pool, state.lock);
    let command = UpdateUserCommand::new(user_id, request.into());

    Ok(Json(handler.update(command, &context).await?))
}

/// DELETE /users/:user_id
async fn delete_user(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DeleteUserResult>, AppError> {
    let handler = UserHandler::new(state.pool, state.lock);
    Ok(Json(handler.delete(user_id, &context).await?))
}

// =========================================================================
// Wallet mutations
// =========================================================================

/// GET /users/:user_id/wallet
async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let store = LedgerStore::new(state.pool);
    let wallet = store
        .wallet_status(user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

    Ok(Json(WalletResponse {
        user_id: wallet.owner_id,
        balance: wallet.balance,
        locked: wallet.locked,
        locked_at: wallet.locked_at,
        updated_at: wallet.updated_at,
    }))
}

async fn apply_mutation(
    state: AppState,
    context: &OperationContext,
    command: MutationCommand,
) -> Result<Json<MutationResponse>, AppError> {
    let handler = TransactionHandler::new(state.pool, state.lock);
    let outcome = handler.execute(command, context).await?;

    Ok(Json(outcome.into()))
}

/// POST /users/:user_id/credit
async fn credit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let command = MutationCommand::credit(user_id, request.amount.into_text());
    apply_mutation(state, &context, command).await
}

/// POST /users/:user_id/debit
async fn debit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(user_id): Path<Uuid>,
    ApiJson(request): ApiJson<AmountRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let command = MutationCommand::debit(user_id, request.amount.into_text());
    apply_mutation(state, &context, command).await
}

/// POST /transactions
async fn create_transaction(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<TransactionRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let command = MutationCommand::new(request.user_id, request.kind, request.amount.into_text());
    apply_mutation(state, &context, command).await
}

// =========================================================================
// History and reports
// =========================================================================

/// GET /users/:user_id/transactions
///
/// Served from the audit trail alone, so it still answers after the user
/// is deleted.
async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let store = LedgerStore::new(state.pool);
    let transactions = store.list_records(user_id).await?;

    Ok(Json(TransactionsResponse {
        user_id,
        transactions,
    }))
}

/// GET /users/:user_id/transactions/summary
async fn transaction_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, AppError> {
    let store = LedgerStore::new(state.pool);
    let snapshot = store
        .reconciliation(user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

    if !snapshot.is_reconciled() {
        tracing::error!(
            user_id = %user_id,
            balance = %snapshot.balance,
            net = %snapshot.summary.net(),
            "Wallet balance does not match its transaction history"
        );
    }

    Ok(Json(SummaryResponse {
        user_id,
        balance: snapshot.balance,
        total_transactions: snapshot.summary.total_count(),
        summary: snapshot.summary,
        net: snapshot.summary.net(),
        reconciled: snapshot.is_reconciled(),
    }))
}

/// GET /users/:user_id/statement
async fn statement(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<StatementResponse>, AppError> {
    let store = LedgerStore::new(state.pool);
    let records = store.statement(user_id).await?;

    if records.is_empty() && store.wallet_status(user_id).await?.is_none() {
        return Err(AppError::UserNotFound(user_id.to_string()));
    }

    Ok(Json(StatementResponse::from_records(user_id, records)))
}
