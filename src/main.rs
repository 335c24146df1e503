//! prom-query-proxy HTTP server
//!
//! Starts an Axum web server that routes Prometheus API requests to the
//! best-suited datasource.

use clap::Parser;
use prom_query_proxy::{
    cli::{Cli, Command, generate_config_template, normalize_listen_addr},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                println!("Configuration template written to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config_path = %cli.config,
        datasources = config.datasources.len(),
        "Loaded configuration"
    );
    for (index, datasource) in config.datasources.iter().enumerate() {
        tracing::info!(
            index = index,
            url = %datasource.url(),
            resolution = ?datasource.resolution(),
            retention = ?datasource.retention(),
            start_time = ?datasource.start_time(),
            "Datasource configured"
        );
    }

    let listen_addr = cli
        .listen
        .as_deref()
        .map(normalize_listen_addr)
        .unwrap_or_else(|| config.listen_addr());

    let state = AppState::new(Arc::new(config))?;
    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
