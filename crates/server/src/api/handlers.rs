use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use salescast_core::domain::forecast::{ForecastPeriod, ForecastRequest};
use salescast_core::domain::sales::SkuId;
use salescast_core::errors::{ApplicationError, DomainError};
use salescast_core::forecast::HISTORY_WINDOW;
use salescast_core::ingest::{sample_csv as sample_csv_text, SAMPLE_FILE_NAME};

use super::error::{new_correlation_id, ApiError};
use super::views::{
    ForecastHistoryView, ForecastView, SalesRecordView, ServiceIndex, SkuListResponse,
    UploadResponse,
};
use super::ApiState;

pub const UPLOAD_FIELD: &str = "file";
pub const MAX_SALES_LIMIT: u32 = 200;
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;
pub const MAX_HISTORY_LIMIT: u32 = 50;

const ENDPOINTS: [&str; 8] = [
    "GET /",
    "GET /api/v1/health",
    "POST /api/v1/upload-csv",
    "POST /api/v1/forecast",
    "GET /api/v1/data/{sku_id}",
    "GET /api/v1/forecast-history/{sku_id}",
    "GET /api/v1/sample-csv",
    "GET /api/v1/skus",
];

#[derive(Debug, Deserialize)]
pub struct ForecastBody {
    pub sku_id: String,
    pub period: ForecastPeriod,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn index(State(state): State<ApiState>) -> Json<ServiceIndex> {
    Json(ServiceIndex {
        service: "salescast",
        version: env!("CARGO_PKG_VERSION"),
        forecasting_mode: state.runtime.mode().as_str(),
        endpoints: ENDPOINTS,
    })
}

pub async fn upload_csv(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let multipart = multipart.map_err(|rejection| {
        ApiError::rejected(rejection.status(), rejection.body_text(), &correlation_id)
    })?;

    let (file_name, bytes) = read_upload(multipart, state.upload_max_bytes)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    let outcome = state
        .runtime
        .import_csv(&bytes)
        .await
        .map_err(|error| ApiError::from_application(error, &correlation_id))?;

    info!(
        event_name = "api.upload.completed",
        correlation_id = %correlation_id,
        file_name = %file_name,
        bytes = bytes.len(),
        rows_processed = outcome.rows_processed,
        "CSV upload processed"
    );
    Ok(Json(UploadResponse::new(outcome, Utc::now())))
}

/// Pulls the `file` part, checking name, emptiness and size in that order.
async fn read_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(String, Bytes), ApplicationError> {
    let too_large = |error: MultipartError| {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApplicationError::PayloadTooLarge { limit: max_bytes }
        } else {
            ApplicationError::InvalidUpload(error.body_text())
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(too_large)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().trim().to_string();
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(ApplicationError::InvalidUpload(
                "only .csv files are accepted".to_string(),
            ));
        }

        let bytes = field.bytes().await.map_err(too_large)?;
        if bytes.is_empty() {
            return Err(ApplicationError::InvalidUpload("uploaded file is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(ApplicationError::PayloadTooLarge { limit: max_bytes });
        }
        return Ok((file_name, bytes));
    }

    Err(ApplicationError::InvalidUpload(format!("multipart field `{UPLOAD_FIELD}` is required")))
}

pub async fn create_forecast(
    State(state): State<ApiState>,
    body: Result<Json<ForecastBody>, JsonRejection>,
) -> Result<Json<ForecastView>, ApiError> {
    let correlation_id = new_correlation_id();
    let Json(body) = body.map_err(|rejection| {
        ApiError::rejected(rejection.status(), rejection.body_text(), &correlation_id)
    })?;

    let sku_id = SkuId::parse(&body.sku_id).ok_or_else(|| {
        ApiError::from_application(DomainError::BlankSku.into(), &correlation_id)
    })?;
    let context = body.context.map(|text| text.trim().to_string()).filter(|text| !text.is_empty());
    let request = ForecastRequest { sku_id, period: body.period, context };

    let forecast = state.runtime.generate(&request).await;
    info!(
        event_name = "api.forecast.served",
        correlation_id = %correlation_id,
        sku_id = %request.sku_id,
        period = request.period.days(),
        source = forecast.source.as_str(),
        "forecast served"
    );
    Ok(Json(ForecastView::from(forecast)))
}

pub async fn sales_data(
    State(state): State<ApiState>,
    Path(sku_id): Path<String>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<SalesRecordView>>, ApiError> {
    let correlation_id = new_correlation_id();
    let (sku_id, limit) =
        sku_and_limit(&sku_id, query, HISTORY_WINDOW, MAX_SALES_LIMIT, &correlation_id)?;

    let rows = state.runtime.sales_data(&sku_id, limit).await;
    Ok(Json(rows.into_iter().map(SalesRecordView::from).collect()))
}

pub async fn forecast_history(
    State(state): State<ApiState>,
    Path(sku_id): Path<String>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<ForecastHistoryView>>, ApiError> {
    let correlation_id = new_correlation_id();
    let (sku_id, limit) =
        sku_and_limit(&sku_id, query, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, &correlation_id)?;

    let items = state.runtime.forecast_history(&sku_id, limit).await;
    Ok(Json(items.into_iter().map(ForecastHistoryView::from).collect()))
}

fn sku_and_limit(
    raw_sku: &str,
    query: Result<Query<LimitQuery>, QueryRejection>,
    default: u32,
    max: u32,
    correlation_id: &str,
) -> Result<(SkuId, u32), ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::rejected(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text(), correlation_id)
    })?;
    let sku_id = SkuId::parse(raw_sku).ok_or(DomainError::BlankSku);
    let limit = bounded_limit(query.limit, default, max);

    sku_id
        .and_then(|sku_id| limit.map(|limit| (sku_id, limit)))
        .map_err(|error| ApiError::from_application(error.into(), correlation_id))
}

pub fn bounded_limit(raw: Option<i64>, default: u32, max: u32) -> Result<u32, DomainError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    u32::try_from(value)
        .ok()
        .filter(|limit| (1..=max).contains(limit))
        .ok_or(DomainError::OutOfRange { field: "limit", min: 1, max, value })
}

pub async fn sample_csv() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{SAMPLE_FILE_NAME}\""),
            ),
        ],
        sample_csv_text(),
    )
}

pub async fn sku_ids(State(state): State<ApiState>) -> Json<SkuListResponse> {
    let skus: Vec<String> = state.runtime.sku_ids().await.into_iter().map(|sku| sku.0).collect();
    Json(SkuListResponse { count: skus.len(), skus })
}

#[cfg(test)]
mod tests {
    use salescast_core::errors::DomainError;

    use super::bounded_limit;

    #[test]
    fn limit_defaults_and_bounds() {
        assert_eq!(bounded_limit(None, 52, 200), Ok(52));
        assert_eq!(bounded_limit(Some(1), 52, 200), Ok(1));
        assert_eq!(bounded_limit(Some(200), 52, 200), Ok(200));
        assert!(matches!(
            bounded_limit(Some(0), 52, 200),
            Err(DomainError::OutOfRange { value: 0, max: 200, .. })
        ));
        assert!(bounded_limit(Some(51), 10, 50).is_err());
        assert!(bounded_limit(Some(-3), 10, 50).is_err());
    }
}
