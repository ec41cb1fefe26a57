//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::ledger::LedgerError;
use crate::wallet::MutationError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Seconds a client should wait after a lock timeout
const LOCK_RETRY_AFTER_SECS: u64 = 1;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Database(e) => AppError::Database(e),
            LedgerError::WalletNotFound(id) => AppError::UserNotFound(id.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn domain_status(err: &DomainError) -> (StatusCode, &'static str, Option<String>) {
    match err {
        DomainError::InsufficientFunds { .. } => {
            (StatusCode::BAD_REQUEST, "insufficient_funds", Some(err.to_string()))
        }
        DomainError::InvalidAmount(msg) => {
            (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
        }
        DomainError::InvalidKind(kind) => {
            (StatusCode::BAD_REQUEST, "invalid_kind", Some(kind.clone()))
        }
        DomainError::InvalidField { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_request", Some(err.to_string()))
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
            }

            // 409 Conflict
            AppError::UserExists(detail) => {
                (StatusCode::CONFLICT, "user_exists", Some(detail.clone()))
            }

            AppError::Domain(domain_err) => domain_status(domain_err),

            AppError::Mutation(mutation_err) => match mutation_err {
                MutationError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
                }
                MutationError::NotFound(id) => {
                    (StatusCode::NOT_FOUND, "user_not_found", Some(id.to_string()))
                }
                MutationError::InsufficientFunds { .. } => (
                    StatusCode::BAD_REQUEST,
                    "insufficient_funds",
                    Some(mutation_err.to_string()),
                ),
                // 503 Service Unavailable: contention, safe to retry
                MutationError::LockTimeout { .. } => {
                    retry_after = Some(LOCK_RETRY_AFTER_SECS);
                    (StatusCode::SERVICE_UNAVAILABLE, "lock_timeout", None)
                }
                MutationError::Persistence(e) => {
                    tracing::error!("Persistence error: {:?}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
                }
            },

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        // Server-side failure text stays in the logs
        let error = if status.is_server_error() && retry_after.is_none() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_request_is_400() {
        let response = AppError::InvalidRequest("bad json".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error_code"], "invalid_request");
        assert_eq!(body["details"], "bad json");
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_400() {
        let err = AppError::Mutation(MutationError::InsufficientFunds {
            required: dec!(10),
            available: dec!(5),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error_code"], "insufficient_funds");
    }

    #[tokio::test]
    async fn test_invalid_kind_is_400() {
        let response = AppError::from(DomainError::InvalidKind("refund".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error_code"], "invalid_kind");
    }

    #[tokio::test]
    async fn test_user_not_found_is_404() {
        let response = AppError::Mutation(MutationError::NotFound(Uuid::nil())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error_code"], "user_not_found");
    }

    #[tokio::test]
    async fn test_user_exists_is_409() {
        let response = AppError::UserExists("email".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_lock_timeout_is_503_with_retry_after() {
        let err = AppError::Mutation(MutationError::LockTimeout {
            owner_id: Uuid::nil(),
            waited: Duration::from_secs(10),
        });
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from(LOCK_RETRY_AFTER_SECS)
        );
        assert_eq!(body_json(response).await["error_code"], "lock_timeout");
    }

    #[tokio::test]
    async fn test_database_error_hides_details() {
        let response = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error_code"], "database_error");
        assert_eq!(body["error"], "Internal server error");
    }
}
