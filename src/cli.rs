//! Command-line interface for prom-query-proxy
//!
//! Provides argument parsing and subcommand handling for the binary.

use clap::{Parser, Subcommand};

/// Datasource routing proxy for Prometheus-compatible backends
#[derive(Parser)]
#[command(name = "prom-query-proxy")]
#[command(version)]
#[command(about = "Datasource routing proxy for Prometheus-compatible backends")]
#[command(
    long_about = "prom-query-proxy forwards each Prometheus query to the backend whose \
    resolution and retention fit it best, and merges label-values lookups across \
    all backends."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PROM_QUERY_PROXY_CONFIG",
        default_value = "config.toml",
        global = true
    )]
    pub config: String,

    /// Listen address, overriding [server] host and port (e.g. ":8080")
    #[arg(short, long, env = "PROM_QUERY_PROXY_LISTEN")]
    pub listen: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Normalise a listen address for binding
///
/// A bare `:port` binds every interface.
pub fn normalize_listen_addr(addr: &str) -> String {
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => addr.to_string(),
    }
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# prom-query-proxy Configuration
# ==============================
#
# Datasources hold the same series at different resolutions and retentions.
# Instant queries go to the finest datasource that still retains the query
# time. Range queries go to the coarsest datasource whose resolution does not
# exceed the query step and that retains the whole range.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
# Overridden by --listen / PROM_QUERY_PROXY_LISTEN
host = "0.0.0.0"

# Port to listen on
port = 8080

# Per-datasource timeout for label-values requests, in seconds (1-300)
label_values_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# DATASOURCES
# ─────────────────────────────────────────────────────────────────────────────
#
# Fields:
#   - url: Base URL of a Prometheus-compatible HTTP API
#   - resolution: Sampling interval of the stored series (e.g. "15s", "5m")
#   - retention: How far back data is kept; omit or "0s" for unbounded
#   - start_time: Informational RFC 3339 timestamp, not used for routing
#
# Order matters: when two datasources are equally suitable the first wins.

[[datasources]]
url = "http://prometheus-raw:9090"
resolution = "15s"
retention = "168h"

[[datasources]]
url = "http://prometheus-5m:9090"
resolution = "5m"
retention = "2160h"

[[datasources]]
url = "http://prometheus-1h:9090"
resolution = "1h"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
"#
}
