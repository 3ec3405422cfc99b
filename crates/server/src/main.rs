mod bootstrap;
mod catalog;
mod health;

use anyhow::Result;
use aurum_core::config::{load_dotenv, AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use aurum_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let dotenv_path = load_dotenv(None)?;
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    if let Some(path) = dotenv_path {
        tracing::info!(
            event_name = "system.bootstrap.dotenv_loaded",
            correlation_id = "bootstrap",
            path = %path.display(),
            "environment loaded from dotenv file"
        );
    }

    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        catalog_source = ?app.catalog_source,
        "aurum-server listening on http://{address}"
    );

    axum::serve(listener, app.router()).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "aurum-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}
