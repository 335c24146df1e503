//! prom-query-proxy - Datasource routing proxy for Prometheus-compatible backends
//!
//! Serves the Prometheus HTTP query API in front of several backends that
//! store the same series at different resolutions and retentions. Instant
//! and range queries are forwarded to the single best-suited backend;
//! label-values lookups are fanned out to all of them and merged.

pub mod cli;
pub mod config;
pub mod datasource;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod shared;
pub mod telemetry;
