//! Public JSON API.
//!
//! - `GET  /`                                  service index
//! - `POST /api/v1/upload-csv`                 multipart `file` import
//! - `POST /api/v1/forecast`                   forecast for one SKU
//! - `GET  /api/v1/data/{sku_id}`              recent sales rows
//! - `GET  /api/v1/forecast-history/{sku_id}`  stored forecasts
//! - `GET  /api/v1/sample-csv`                 sample upload file
//! - `GET  /api/v1/skus`                       known SKU ids

mod error;
mod handlers;
mod views;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use salescast_agent::ForecastRuntime;

/// Headroom for multipart boundaries and part headers on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct ApiState {
    runtime: ForecastRuntime,
    upload_max_bytes: usize,
}

impl ApiState {
    pub fn new(runtime: ForecastRuntime, upload_max_bytes: usize) -> Self {
        Self { runtime, upload_max_bytes }
    }
}

pub fn router(state: ApiState) -> Router {
    let body_limit = state.upload_max_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/v1/upload-csv",
            post(handlers::upload_csv).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/v1/forecast", post(handlers::create_forecast))
        .route("/api/v1/data/{sku_id}", get(handlers::sales_data))
        .route("/api/v1/forecast-history/{sku_id}", get(handlers::forecast_history))
        .route("/api/v1/sample-csv", get(handlers::sample_csv))
        .route("/api/v1/skus", get(handlers::sku_ids))
        .with_state(state)
}
