//! Error types for prom-query-proxy
//!
//! All errors implement `IntoResponse` for Axum handlers. Bodies are plain text
//! so that Prometheus clients surface the message verbatim.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("invalid parameter {name}: cannot parse {value:?}: {reason}")]
    BadParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Datasource for the query is not found")]
    NoEligibleDatasource,

    #[error("Backend {url} is unreachable: {reason}")]
    BackendUnreachable { url: String, reason: String },

    #[error("Request to {url} timed out after {timeout_seconds} seconds")]
    BackendTimeout { url: String, timeout_seconds: u64 },

    #[error("Backend {url} returned an unusable response: {reason}")]
    BadUpstreamPayload { url: String, reason: String },

    #[error("Error serializing to JSON: {0}")]
    ResponseSerialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status reported to the caller for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadParameter { .. } | Self::NoEligibleDatasource => StatusCode::BAD_REQUEST,
            Self::BackendUnreachable { .. } | Self::BadUpstreamPayload { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Config(_)
            | Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::ResponseSerialization(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self),
        )
            .into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
