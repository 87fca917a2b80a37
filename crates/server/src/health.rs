use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use salescast_agent::ForecastingMode;
use salescast_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    mode: ForecastingMode,
}

impl HealthState {
    pub fn new(db_pool: DbPool, mode: ForecastingMode) -> Self {
        Self { db_pool, mode }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub forecasting: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/api/v1/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!("salescast-server {}", env!("CARGO_PKG_VERSION")),
        },
        database,
        forecasting: forecasting_check(state.mode),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales_record").fetch_one(pool).await {
        Ok(rows) => HealthCheck { status: "ready", detail: format!("{rows} sales rows stored") },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn forecasting_check(mode: ForecastingMode) -> HealthCheck {
    let detail = match mode {
        ForecastingMode::Live => "forecasts are requested from the configured model",
        ForecastingMode::Mock => "no vendor credentials configured; forecasts are synthesized locally",
    };
    HealthCheck { status: mode.as_str(), detail: detail.to_string() }
}
