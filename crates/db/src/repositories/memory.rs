use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tokio::sync::RwLock;

use salescast_core::domain::forecast::{Forecast, ForecastHistoryItem};
use salescast_core::domain::sales::{SalesRecord, SkuId};

use super::{ForecastRepository, RepositoryError, SalesRepository};

#[derive(Default)]
pub struct InMemorySalesRepository {
    records: RwLock<HashMap<(String, NaiveDate), SalesRecord>>,
}

#[async_trait::async_trait]
impl SalesRepository for InMemorySalesRepository {
    async fn upsert_many(&self, records: &[SalesRecord]) -> Result<u64, RepositoryError> {
        let mut stored = self.records.write().await;
        for record in records {
            stored.insert((record.sku_id.0.clone(), record.date), record.clone());
        }
        Ok(records.len() as u64)
    }

    async fn recent_for_sku(
        &self,
        sku_id: &SkuId,
        limit: u32,
    ) -> Result<Vec<SalesRecord>, RepositoryError> {
        let stored = self.records.read().await;
        let mut rows: Vec<SalesRecord> =
            stored.values().filter(|record| record.sku_id == *sku_id).cloned().collect();
        rows.sort_by(|left, right| right.date.cmp(&left.date));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_sku_ids(&self) -> Result<Vec<SkuId>, RepositoryError> {
        let stored = self.records.read().await;
        let ids: BTreeSet<&SkuId> = stored.values().map(|record| &record.sku_id).collect();
        Ok(ids.into_iter().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryForecastRepository {
    forecasts: RwLock<Vec<(i64, Forecast)>>,
}

impl InMemoryForecastRepository {
    pub async fn len(&self) -> usize {
        self.forecasts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.forecasts.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ForecastRepository for InMemoryForecastRepository {
    async fn insert(&self, forecast: &Forecast) -> Result<i64, RepositoryError> {
        let mut forecasts = self.forecasts.write().await;
        let id = forecasts.last().map_or(1, |(id, _)| id + 1);
        forecasts.push((id, forecast.clone()));
        Ok(id)
    }

    async fn history_for_sku(
        &self,
        sku_id: &SkuId,
        limit: u32,
    ) -> Result<Vec<ForecastHistoryItem>, RepositoryError> {
        let forecasts = self.forecasts.read().await;
        let mut items: Vec<ForecastHistoryItem> = forecasts
            .iter()
            .filter(|(_, forecast)| forecast.sku_id == *sku_id)
            .map(|(id, forecast)| ForecastHistoryItem {
                id: *id,
                sku_id: forecast.sku_id.clone(),
                forecast_period: forecast.forecast_period,
                generated_at: forecast.generated_at,
                total_predicted_units: forecast.total_predicted_units,
                total_predicted_revenue: forecast.total_predicted_revenue,
                average_confidence: forecast.average_confidence,
                explanation: Some(forecast.explanation.clone()),
                source: forecast.source,
            })
            .collect();
        items.sort_by(|left, right| {
            right.generated_at.cmp(&left.generated_at).then(right.id.cmp(&left.id))
        });
        items.truncate(limit as usize);
        Ok(items)
    }
}
