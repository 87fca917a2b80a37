use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use salescast_core::domain::sales::{SalesRecord, SkuId};

use super::{RepositoryError, SalesRepository};
use crate::DbPool;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlSalesRepository {
    pool: DbPool,
}

impl SqlSalesRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesRepository for SqlSalesRepository {
    async fn upsert_many(&self, records: &[SalesRecord]) -> Result<u64, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO sales_record (
                    sku_id, sale_date, units_sold, revenue, weather_temp, season,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(sku_id, sale_date) DO UPDATE SET
                    units_sold = excluded.units_sold,
                    revenue = excluded.revenue,
                    weather_temp = excluded.weather_temp,
                    season = excluded.season,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(record.sku_id.as_str())
            .bind(record.date.format(DATE_FORMAT).to_string())
            .bind(i64::from(record.units_sold))
            .bind(record.revenue.to_string())
            .bind(record.weather_temp)
            .bind(record.season.as_deref())
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn recent_for_sku(
        &self,
        sku_id: &SkuId,
        limit: u32,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT sku_id, sale_date, units_sold, revenue, weather_temp, season
            FROM sales_record
            WHERE sku_id = ?
            ORDER BY sale_date DESC
            LIMIT ?
            "#,
        )
        .bind(sku_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(sales_record_from_row).collect()
    }

    async fn list_sku_ids(&self) -> Result<Vec<SkuId>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT sku_id FROM sales_record ORDER BY sku_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("sku_id").map(SkuId).map_err(Into::into))
            .collect()
    }
}

fn sales_record_from_row(row: &SqliteRow) -> Result<SalesRecord, RepositoryError> {
    let sale_date: String = row.try_get("sale_date")?;
    let units_sold: i64 = row.try_get("units_sold")?;
    let revenue: String = row.try_get("revenue")?;

    Ok(SalesRecord {
        sku_id: SkuId(row.try_get("sku_id")?),
        date: NaiveDate::parse_from_str(&sale_date, DATE_FORMAT).map_err(|e| {
            RepositoryError::Decode(format!("invalid sale_date `{sale_date}`: {e}"))
        })?,
        units_sold: u32::try_from(units_sold)
            .map_err(|_| RepositoryError::Decode(format!("invalid units_sold: {units_sold}")))?,
        revenue: Decimal::from_str(&revenue)
            .map_err(|e| RepositoryError::Decode(format!("invalid revenue `{revenue}`: {e}")))?,
        weather_temp: row.try_get("weather_temp")?,
        season: row.try_get("season")?,
    })
}
