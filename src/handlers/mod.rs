//! HTTP request handlers and routing table

use crate::config::{Config, Datasource};
use crate::datasource::LabelValuesAggregator;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use axum::{
    Router,
    http::StatusCode,
    routing::{any, get},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod label_values;
pub mod metrics;
pub mod query;

/// Application state shared across all handlers
///
/// The configuration (and with it the datasource list) is never mutated after
/// startup, so it is shared behind an `Arc` without locking.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    client: reqwest::Client,
    metrics: Arc<Metrics>,
    label_values: LabelValuesAggregator,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the metrics registry cannot be
    /// built.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        // Redirects are relayed to the caller, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let metrics = Arc::new(
            Metrics::new()
                .map_err(|e| AppError::Internal(format!("Failed to register metrics: {}", e)))?,
        );

        let label_values = LabelValuesAggregator::new(
            client.clone(),
            config.label_values_timeout(),
            metrics.clone(),
        );

        Ok(Self {
            config,
            client,
            metrics,
            label_values,
        })
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ordered datasource list
    pub fn datasources(&self) -> &[Datasource] {
        &self.config.datasources
    }

    /// Shared HTTP client used for forwarding
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Get reference to the metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get reference to the label-values aggregator
    pub fn label_values(&self) -> &LabelValuesAggregator {
        &self.label_values
    }
}

/// Build the application router
///
/// Query endpoints accept any method and forward it verbatim; unknown paths
/// get a plain 404.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/query", any(query::instant_handler))
        .route("/api/v1/query_range", any(query::range_handler))
        .route("/api/v1/label/{name}/values", get(label_values::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
