use std::sync::Arc;

use salescast_agent::{CompletionError, ForecastRuntime, ForecastingClient};
use salescast_core::config::{AppConfig, ConfigError, LoadOptions};
use salescast_core::errors::ApplicationError;
use salescast_db::{connect, migrations, DbPool, SqlForecastRepository, SqlSalesRepository};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: ForecastRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("forecasting client could not be built: {0}")]
    Forecasting(#[source] CompletionError),
}

impl From<BootstrapError> for ApplicationError {
    fn from(error: BootstrapError) -> Self {
        match error {
            BootstrapError::Config(_) | BootstrapError::DatabaseConnect(_) => {
                Self::Configuration(error.to_string())
            }
            BootstrapError::Migration(_) => Self::Persistence(error.to_string()),
            BootstrapError::Forecasting(_) => Self::Integration(error.to_string()),
        }
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects and migrates the store, then wires the forecast runtime.
/// Missing vendor credentials select mock mode rather than failing.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let forecaster =
        ForecastingClient::from_config(&config.llm).map_err(BootstrapError::Forecasting)?;
    let runtime = ForecastRuntime::new(
        Arc::new(SqlSalesRepository::new(db_pool.clone())),
        Arc::new(SqlForecastRepository::new(db_pool.clone())),
        forecaster,
    );
    info!(
        event_name = "system.bootstrap.forecasting_ready",
        mode = runtime.mode().as_str(),
        credential_mode = ?config.llm.credential_mode(),
        "forecast runtime initialized"
    );

    Ok(Application { config, db_pool, runtime })
}

#[cfg(test)]
mod tests {
    use salescast_agent::ForecastingMode;
    use salescast_core::config::{ConfigOverrides, LoadOptions};
    use salescast_core::errors::ApplicationError;

    use crate::bootstrap::bootstrap;

    fn options(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_without_credentials_runs_in_mock_mode() {
        let app = bootstrap(options("sqlite::memory:")).await.expect("bootstrap should succeed");

        assert_eq!(app.runtime.mode(), ForecastingMode::Mock);

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('sales_record', 'forecast_record')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables should exist after bootstrap");
        assert_eq!(table_count, 2);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_unusable_database_url() {
        let result = bootstrap(options("postgres://not-supported")).await;

        let message = result.err().map(ApplicationError::from);
        assert!(
            matches!(message, Some(ApplicationError::Configuration(ref detail)) if detail.contains("database")),
            "unexpected error: {message:?}"
        );
    }
}
