//! Prometheus metrics collection for prom-query-proxy
//!
//! This module provides metrics instrumentation for tracking:
//! - Requests by proxied endpoint
//! - Which datasource each query was routed to
//! - Queries no datasource could answer
//! - Forwarding and label-values backend failures
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::error::AppError;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Proxied API endpoint, used as a bounded metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/api/v1/query`
    Query,
    /// `/api/v1/query_range`
    QueryRange,
    /// `/api/v1/label/<name>/values`
    LabelValues,
}

impl Endpoint {
    /// Convert endpoint to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Query => "query",
            Endpoint::QueryRange => "query_range",
            Endpoint::LabelValues => "label_values",
        }
    }
}

/// Why a label-values backend contributed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    /// The per-backend timeout expired
    Timeout,
    /// Connection or transport failure
    Unreachable,
    /// Non-200 status, non-success payload, or undecodable body
    BadPayload,
    /// The fan-out task itself panicked or was cancelled
    TaskFailed,
}

impl BackendFailure {
    /// Convert failure kind to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendFailure::Timeout => "timeout",
            BackendFailure::Unreachable => "unreachable",
            BackendFailure::BadPayload => "bad_payload",
            BackendFailure::TaskFailed => "task_failed",
        }
    }
}

impl From<&AppError> for BackendFailure {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::BackendTimeout { .. } => BackendFailure::Timeout,
            AppError::BackendUnreachable { .. } => BackendFailure::Unreachable,
            AppError::BadUpstreamPayload { .. } => BackendFailure::BadPayload,
            _ => BackendFailure::TaskFailed,
        }
    }
}

/// Metrics collector for prom-query-proxy
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    requests_total: IntCounterVec,
    datasource_selections: IntCounterVec,
    no_datasource: IntCounterVec,
    forward_failures: IntCounterVec,
    label_values_backend_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new(
                "prom_query_proxy_requests_total",
                "Total number of proxied API requests by endpoint",
            ),
            &["endpoint"],
        )?;

        // Cardinality: 2 endpoints × N datasources (bounded by config)
        let datasource_selections = IntCounterVec::new(
            Opts::new(
                "prom_query_proxy_datasource_selections_total",
                "Total number of queries routed to each datasource",
            ),
            &["endpoint", "datasource"],
        )?;

        let no_datasource = IntCounterVec::new(
            Opts::new(
                "prom_query_proxy_no_datasource_total",
                "Total number of queries rejected because no datasource could serve them",
            ),
            &["endpoint"],
        )?;

        let forward_failures = IntCounterVec::new(
            Opts::new(
                "prom_query_proxy_forward_failures_total",
                "Total number of forwarded queries that failed at the transport level",
            ),
            &["datasource"],
        )?;

        // Label-values failures are never surfaced to callers; this counter
        // and the logs are the only place they show up.
        let label_values_backend_failures = IntCounterVec::new(
            Opts::new(
                "prom_query_proxy_label_values_backend_failures_total",
                "Total number of label-values backend calls that contributed nothing, by reason",
            ),
            &["reason"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(datasource_selections.clone()))?;
        registry.register(Box::new(no_datasource.clone()))?;
        registry.register(Box::new(forward_failures.clone()))?;
        registry.register(Box::new(label_values_backend_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            datasource_selections,
            no_datasource,
            forward_failures,
            label_values_backend_failures,
        })
    }

    /// Record an inbound request for a proxied endpoint
    pub fn record_request(&self, endpoint: Endpoint) -> Result<(), prometheus::Error> {
        self.requests_total
            .get_metric_with_label_values(&[endpoint.as_str()])?
            .inc();
        Ok(())
    }

    /// Record that a query was routed to `datasource`
    pub fn record_selection(
        &self,
        endpoint: Endpoint,
        datasource: &str,
    ) -> Result<(), prometheus::Error> {
        self.datasource_selections
            .get_metric_with_label_values(&[endpoint.as_str(), datasource])?
            .inc();
        Ok(())
    }

    /// Record a query no datasource could serve
    pub fn record_no_datasource(&self, endpoint: Endpoint) -> Result<(), prometheus::Error> {
        self.no_datasource
            .get_metric_with_label_values(&[endpoint.as_str()])?
            .inc();
        Ok(())
    }

    /// Record a transport failure while forwarding to `datasource`
    pub fn record_forward_failure(&self, datasource: &str) -> Result<(), prometheus::Error> {
        self.forward_failures
            .get_metric_with_label_values(&[datasource])?
            .inc();
        Ok(())
    }

    /// Record a label-values backend that contributed nothing
    pub fn record_backend_failure(&self, failure: BackendFailure) -> Result<(), prometheus::Error> {
        self.label_values_backend_failures
            .get_metric_with_label_values(&[failure.as_str()])?
            .inc();
        Ok(())
    }

    /// Current count of label-values backend failures for one reason
    pub fn backend_failure_count(&self, failure: BackendFailure) -> u64 {
        self.label_values_backend_failures
            .get_metric_with_label_values(&[failure.as_str()])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Encode all registered metrics in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    metric_family_count = metric_families.len(),
                    "Prometheus text encoder failed"
                );
                e
            })?;

        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("Metrics output is not UTF-8: {}", e)))
    }
}

/// Log instead of failing the request when a metric cannot be recorded
pub fn log_recording_failure(result: Result<(), prometheus::Error>, operation: &'static str) {
    if let Err(e) = result {
        tracing::warn!(
            operation = operation,
            error = %e,
            "Failed to record metric"
        );
    }
}
