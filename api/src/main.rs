use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use slotd_api::{
    config::{LogFormat, SlotdConfig},
    server,
};
use slotd_db::storage::{
    memory::MemoryLedger,
    sqlite::{SqliteLedger, SqliteOptions},
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "slotd_api=info,slotd_db=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SlotdConfig::parse();

    if config.dump_openapi {
        // The description does not depend on the backing store.
        let ledger = Arc::new(MemoryLedger::new(config.max_agents));
        let (_, api) = server::make(config.clone(), ledger);
        print!("{}", api.to_pretty_json()?);
        return Ok(());
    }

    init_tracing(config.log_format);

    let ledger = SqliteLedger::open(
        &config.database_path,
        SqliteOptions {
            fallback_max_agents: config.max_agents,
            ..Default::default()
        },
    )
    .await
    .with_context(|| format!("failed to open database at {}", config.database_path))?;

    let (router, _) = server::make(config.clone(), Arc::new(ledger));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(
        job_name = %config.job_name,
        fallback_max_agents = config.max_agents,
        "Listening on http://{:?}",
        config.bind_addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or(DEFAULT_LOG_FILTER.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
