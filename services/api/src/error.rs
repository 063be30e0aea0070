//! services/api/src/error.rs
//!
//! Defines the error types of the gateway service: `ApiError` for startup
//! failures and `GatewayError` for failures reported back to HTTP callers.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use share_link_core::ports::PortError;
use utoipa::ToSchema;

/// The primary error type for starting the `share-gateway` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a failure to build the outbound HTTP client.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//=========================================================================================
// Gateway Error Envelope
//=========================================================================================

/// The uniform body of every failed gateway response.
#[derive(Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// A failure surfaced to an HTTP caller.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Plugin not configured. Please configure the backend URL and API key.")]
    NotConfigured,

    /// Caller-side problem: bad input, unknown item, nothing to share.
    #[error("{0}")]
    BadRequest(String),

    /// The share backend (or the catalog behind it) failed.
    #[error("{context}: {source}")]
    Backend {
        context: &'static str,
        source: PortError,
    },

    /// An operation failed with nothing more specific to report.
    #[error("{0}")]
    Failed(&'static str),

    #[error("Request cancelled, the server is shutting down")]
    Cancelled,
}

impl GatewayError {
    /// Maps a port failure, naming the operation for operational faults.
    pub fn from_port(context: &'static str, error: PortError) -> Self {
        match error {
            PortError::NotConfigured => GatewayError::NotConfigured,
            PortError::ItemNotFound(_) => GatewayError::BadRequest("Item not found".to_string()),
            PortError::NoChildren => GatewayError::BadRequest("No child items found".to_string()),
            PortError::Cancelled => GatewayError::Cancelled,
            source => GatewayError::Backend { context, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotConfigured | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Backend { source, .. } if !source.is_operational() => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Backend { .. } | GatewayError::Failed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorEnvelope {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
