//! Operation Context
//!
//! Metadata about the current request, carried into the mutator for tracing.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header set by the request-id layer
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context for an operation, used for tracing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationContext {
    /// Request ID for correlating log lines across layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
}

impl OperationContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        Self { request_id }
    }

    /// Create context with request ID
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Generate a new request ID if not present
    pub fn ensure_request_id(&mut self) -> Uuid {
        *self.request_id.get_or_insert_with(Uuid::new_v4)
    }
}
