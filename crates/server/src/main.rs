mod api;
mod bootstrap;
mod health;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use salescast_core::config::{AppConfig, LoadOptions};
use salescast_core::errors::ApplicationError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::api::ApiState;
use crate::bootstrap::Application;
use crate::health::HealthState;

fn init_logging(config: &AppConfig) {
    use salescast_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

fn app_router(app: &Application) -> Router {
    let router = api::router(ApiState::new(app.runtime.clone(), app.config.upload.max_bytes))
        .merge(health::router(HealthState::new(app.db_pool.clone(), app.runtime.mode())))
        .layer(TraceLayer::new_for_http());

    if app.config.server.cors_allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await.map_err(|error| {
        let error = ApplicationError::from(error);
        tracing::error!(
            event_name = "system.bootstrap.failed",
            error = %error,
            "application bootstrap failed"
        );
        error
    })?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        forecasting_mode = app.runtime.mode().as_str(),
        "salescast-server listening"
    );

    let server = axum::serve(listener, app_router(&app))
        .with_graceful_shutdown(wait_for_shutdown())
        .into_future();
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = wait_for_shutdown().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish in time"
            );
        }
    }

    app.db_pool.close().await;
    tracing::info!(event_name = "system.server.stopped", "salescast-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    tracing::info!(event_name = "system.server.stopping", "shutdown signal received");
}
