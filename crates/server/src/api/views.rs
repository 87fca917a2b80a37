//! Wire shapes. Money is rendered as JSON numbers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use salescast_agent::ImportOutcome;
use salescast_core::domain::forecast::{
    Forecast, ForecastHistoryItem, ForecastPrediction, ForecastSource,
};
use salescast_core::domain::sales::SalesRecord;

#[derive(Debug, Serialize)]
pub struct SalesRecordView {
    pub sku_id: String,
    pub date: NaiveDate,
    pub units_sold: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    pub weather_temp: Option<f64>,
    pub season: Option<String>,
}

impl From<SalesRecord> for SalesRecordView {
    fn from(record: SalesRecord) -> Self {
        Self {
            sku_id: record.sku_id.0,
            date: record.date,
            units_sold: record.units_sold,
            revenue: record.revenue,
            weather_temp: record.weather_temp,
            season: record.season,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionView {
    pub date: NaiveDate,
    pub predicted_units: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub predicted_revenue: Decimal,
    pub confidence: f64,
    pub predicted_temp: Option<f64>,
}

impl From<ForecastPrediction> for PredictionView {
    fn from(prediction: ForecastPrediction) -> Self {
        Self {
            date: prediction.date,
            predicted_units: prediction.predicted_units,
            predicted_revenue: prediction.predicted_revenue,
            confidence: prediction.confidence,
            predicted_temp: prediction.predicted_temp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastView {
    pub sku_id: String,
    pub forecast_period: u32,
    pub generated_at: DateTime<Utc>,
    pub predictions: Vec<PredictionView>,
    pub total_predicted_units: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_predicted_revenue: Decimal,
    pub average_confidence: f64,
    pub explanation: String,
    pub source: ForecastSource,
    pub generated_by_model: bool,
}

impl From<Forecast> for ForecastView {
    fn from(forecast: Forecast) -> Self {
        Self {
            sku_id: forecast.sku_id.0,
            forecast_period: forecast.forecast_period,
            generated_at: forecast.generated_at,
            predictions: forecast.predictions.into_iter().map(PredictionView::from).collect(),
            total_predicted_units: forecast.total_predicted_units,
            total_predicted_revenue: forecast.total_predicted_revenue,
            average_confidence: forecast.average_confidence,
            explanation: forecast.explanation,
            generated_by_model: forecast.source.is_model_generated(),
            source: forecast.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastHistoryView {
    pub id: i64,
    pub sku_id: String,
    pub forecast_period: u32,
    pub generated_at: DateTime<Utc>,
    pub total_predicted_units: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_predicted_revenue: Decimal,
    pub average_confidence: f64,
    pub explanation: Option<String>,
    pub source: ForecastSource,
    pub generated_by_model: bool,
}

impl From<ForecastHistoryItem> for ForecastHistoryView {
    fn from(item: ForecastHistoryItem) -> Self {
        Self {
            id: item.id,
            sku_id: item.sku_id.0,
            forecast_period: item.forecast_period,
            generated_at: item.generated_at,
            total_predicted_units: item.total_predicted_units,
            total_predicted_revenue: item.total_predicted_revenue,
            average_confidence: item.average_confidence,
            explanation: item.explanation,
            generated_by_model: item.source.is_model_generated(),
            source: item.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub rows_processed: u64,
    pub total_rows: usize,
    pub rejected_rows: usize,
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl UploadResponse {
    pub fn new(outcome: ImportOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            message: format!("Successfully processed {} records", outcome.rows_processed),
            rows_processed: outcome.rows_processed,
            total_rows: outcome.total_rows,
            rejected_rows: outcome.rejected_rows,
            warnings: outcome.warnings,
            timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SkuListResponse {
    pub skus: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub service: &'static str,
    pub version: &'static str,
    pub forecasting_mode: &'static str,
    pub endpoints: [&'static str; 8],
}
