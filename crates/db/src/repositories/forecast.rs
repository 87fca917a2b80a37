use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use salescast_core::domain::forecast::{Forecast, ForecastHistoryItem, ForecastSource};
use salescast_core::domain::sales::SkuId;

use super::{ForecastRepository, RepositoryError};
use crate::DbPool;

pub struct SqlForecastRepository {
    pool: DbPool,
}

impl SqlForecastRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastRepository for SqlForecastRepository {
    async fn insert(&self, forecast: &Forecast) -> Result<i64, RepositoryError> {
        let predictions_json = serde_json::to_string(&forecast.predictions)
            .map_err(|e| RepositoryError::Decode(format!("could not encode predictions: {e}")))?;
        let total_units = i64::try_from(forecast.total_predicted_units).map_err(|_| {
            RepositoryError::Decode(format!(
                "total_predicted_units out of range: {}",
                forecast.total_predicted_units
            ))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO forecast_record (
                sku_id, forecast_period, generated_at, predictions_json,
                total_predicted_units, total_predicted_revenue, average_confidence,
                explanation, source
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(forecast.sku_id.as_str())
        .bind(i64::from(forecast.forecast_period))
        .bind(forecast.generated_at.to_rfc3339())
        .bind(predictions_json)
        .bind(total_units)
        .bind(forecast.total_predicted_revenue.to_string())
        .bind(forecast.average_confidence)
        .bind(&forecast.explanation)
        .bind(forecast.source.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn history_for_sku(
        &self,
        sku_id: &SkuId,
        limit: u32,
    ) -> Result<Vec<ForecastHistoryItem>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, sku_id, forecast_period, generated_at, total_predicted_units,
                total_predicted_revenue, average_confidence, explanation, source
            FROM forecast_record
            WHERE sku_id = ?
            ORDER BY generated_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(sku_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(history_item_from_row).collect()
    }
}

fn history_item_from_row(row: &SqliteRow) -> Result<ForecastHistoryItem, RepositoryError> {
    let forecast_period: i64 = row.try_get("forecast_period")?;
    let generated_at: String = row.try_get("generated_at")?;
    let total_units: i64 = row.try_get("total_predicted_units")?;
    let total_revenue: String = row.try_get("total_predicted_revenue")?;
    let source: String = row.try_get("source")?;

    Ok(ForecastHistoryItem {
        id: row.try_get("id")?,
        sku_id: SkuId(row.try_get("sku_id")?),
        forecast_period: u32::try_from(forecast_period).map_err(|_| {
            RepositoryError::Decode(format!("invalid forecast_period: {forecast_period}"))
        })?,
        generated_at: parse_timestamp("generated_at", generated_at)?,
        total_predicted_units: u64::try_from(total_units).map_err(|_| {
            RepositoryError::Decode(format!("invalid total_predicted_units: {total_units}"))
        })?,
        total_predicted_revenue: Decimal::from_str(&total_revenue).map_err(|e| {
            RepositoryError::Decode(format!("invalid total_predicted_revenue: {e}"))
        })?,
        average_confidence: row.try_get("average_confidence")?,
        explanation: row.try_get("explanation")?,
        source: ForecastSource::from_str(&source).map_err(RepositoryError::Decode)?,
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}
