use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use salescast_core::domain::forecast::{Forecast, ForecastHistoryItem, ForecastRequest};
use salescast_core::domain::sales::{SalesRecord, SkuId};
use salescast_core::errors::ApplicationError;
use salescast_core::forecast::{HistorySummary, HISTORY_WINDOW};
use salescast_db::repositories::{ForecastRepository, RepositoryError, SalesRepository};

use crate::forecaster::{ForecastingClient, ForecastingMode};
use crate::ingest::{self, ImportOutcome};

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("could not load sales history: {0}")]
    History(#[from] RepositoryError),
    #[error("forecasting model call failed: {0}")]
    Model(String),
    #[error("model reply had no usable predictions: {note}")]
    NoUsablePredictions { note: String },
    #[error("model returned {actual} of {expected} predictions")]
    ShortForecast { expected: usize, actual: usize },
}

/// Forecast orchestrator plus the read-through queries the API exposes.
#[derive(Clone)]
pub struct ForecastRuntime {
    sales: Arc<dyn SalesRepository>,
    forecasts: Arc<dyn ForecastRepository>,
    forecaster: ForecastingClient,
}

impl ForecastRuntime {
    pub fn new(
        sales: Arc<dyn SalesRepository>,
        forecasts: Arc<dyn ForecastRepository>,
        forecaster: ForecastingClient,
    ) -> Self {
        Self { sales, forecasts, forecaster }
    }

    pub fn mode(&self) -> ForecastingMode {
        self.forecaster.mode()
    }

    /// Produces a forecast for every request. Any failure along the way
    /// yields the deterministic fallback, which is not persisted.
    pub async fn generate(&self, request: &ForecastRequest) -> Forecast {
        let now = Utc::now();
        match self.try_generate(request, now).await {
            Ok(forecast) => forecast,
            Err(error) => {
                warn!(
                    event_name = "forecast.fallback.used",
                    sku_id = %request.sku_id,
                    period = request.period.days(),
                    error = %error,
                    "serving baseline forecast"
                );
                Forecast::fallback(request, now)
            }
        }
    }

    /// Loads history, asks the forecaster, validates the reply and persists
    /// the result. A failed insert is logged and does not fail the call.
    pub async fn try_generate(
        &self,
        request: &ForecastRequest,
        now: DateTime<Utc>,
    ) -> Result<Forecast, OrchestrationError> {
        let history = self.sales.recent_for_sku(&request.sku_id, HISTORY_WINDOW).await?;
        let summary = HistorySummary::from_records(&history);

        let output = self
            .forecaster
            .forecast(request, &history, &summary, now)
            .await
            .map_err(|error| OrchestrationError::Model(format!("{error:#}")))?;

        let expected = request.period.days() as usize;
        let mut predictions = output.predictions;
        if predictions.is_empty() {
            return Err(OrchestrationError::NoUsablePredictions { note: output.explanation });
        }
        if predictions.len() < expected {
            return Err(OrchestrationError::ShortForecast { expected, actual: predictions.len() });
        }
        predictions.truncate(expected);

        let forecast = Forecast::assemble(
            request.sku_id.clone(),
            request.period,
            now,
            predictions,
            output.explanation,
            output.source,
        );

        match self.forecasts.insert(&forecast).await {
            Ok(id) => info!(
                event_name = "forecast.generated",
                forecast_id = id,
                sku_id = %forecast.sku_id,
                source = forecast.source.as_str(),
                history_records = summary.record_count,
                trend = summary.trend.as_str(),
                "forecast stored"
            ),
            Err(error) => warn!(
                event_name = "forecast.persist_failed",
                sku_id = %forecast.sku_id,
                error = %error,
                "forecast generated but not stored"
            ),
        }

        Ok(forecast)
    }

    pub async fn import_csv(&self, bytes: &[u8]) -> Result<ImportOutcome, ApplicationError> {
        ingest::import_csv(self.sales.as_ref(), bytes).await
    }

    /// Most recent sales rows; empty when the store is unavailable.
    pub async fn sales_data(&self, sku_id: &SkuId, limit: u32) -> Vec<SalesRecord> {
        self.sales.recent_for_sku(sku_id, limit).await.unwrap_or_else(|error| {
            warn!(
                event_name = "store.read_failed",
                query = "sales_data",
                sku_id = %sku_id,
                error = %error,
                "returning empty result"
            );
            Vec::new()
        })
    }

    /// Stored forecasts, newest first; empty when the store is unavailable.
    pub async fn forecast_history(&self, sku_id: &SkuId, limit: u32) -> Vec<ForecastHistoryItem> {
        self.forecasts.history_for_sku(sku_id, limit).await.unwrap_or_else(|error| {
            warn!(
                event_name = "store.read_failed",
                query = "forecast_history",
                sku_id = %sku_id,
                error = %error,
                "returning empty result"
            );
            Vec::new()
        })
    }

    pub async fn sku_ids(&self) -> Vec<SkuId> {
        self.sales.list_sku_ids().await.unwrap_or_else(|error| {
            warn!(
                event_name = "store.read_failed",
                query = "sku_ids",
                error = %error,
                "returning empty result"
            );
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use salescast_core::domain::forecast::{
        Forecast, ForecastHistoryItem, ForecastPeriod, ForecastRequest, ForecastSource,
    };
    use salescast_core::domain::sales::{SalesRecord, SkuId};
    use salescast_core::forecast::FALLBACK_CONFIDENCE;
    use salescast_db::repositories::{
        ForecastRepository, InMemoryForecastRepository, InMemorySalesRepository, RepositoryError,
        SalesRepository,
    };

    use super::{ForecastRuntime, OrchestrationError};
    use crate::forecaster::ForecastingClient;
    use crate::llm::LlmClient;

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    struct CannedClient(String);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.clone())
        }
    }

    struct BrokenForecastStore;

    #[async_trait]
    impl ForecastRepository for BrokenForecastStore {
        async fn insert(&self, _forecast: &Forecast) -> Result<i64, RepositoryError> {
            Err(RepositoryError::Decode("read-only database".to_string()))
        }

        async fn history_for_sku(
            &self,
            _sku_id: &SkuId,
            _limit: u32,
        ) -> Result<Vec<ForecastHistoryItem>, RepositoryError> {
            Err(RepositoryError::Decode("read-only database".to_string()))
        }
    }

    fn request(period: ForecastPeriod) -> ForecastRequest {
        ForecastRequest { sku_id: SkuId("PARKA".to_string()), period, context: None }
    }

    fn runtime_with(
        client: ForecastingClient,
    ) -> (ForecastRuntime, Arc<InMemorySalesRepository>, Arc<InMemoryForecastRepository>) {
        let sales = Arc::new(InMemorySalesRepository::default());
        let forecasts = Arc::new(InMemoryForecastRepository::default());
        (ForecastRuntime::new(sales.clone(), forecasts.clone(), client), sales, forecasts)
    }

    fn week_reply(days: usize) -> String {
        let predictions: Vec<String> = (1..=days)
            .map(|day| {
                format!(
                    r#"{{"date": "2024-03-{day:02}", "predicted_units": 4, "predicted_revenue": 12000, "confidence": 0.9}}"#
                )
            })
            .collect();
        format!(
            r#"Here you go: {{"predictions": [{}], "explanation": "demand holds"}}"#,
            predictions.join(", ")
        )
    }

    #[tokio::test]
    async fn no_history_and_unreachable_model_yields_baseline_week() {
        let (runtime, _, forecasts) =
            runtime_with(ForecastingClient::live(Arc::new(FailingClient)));

        let forecast = runtime.generate(&request(ForecastPeriod::Week)).await;

        assert_eq!(forecast.predictions.len(), 7);
        assert_eq!(forecast.source, ForecastSource::Fallback);
        assert!(!forecast.source.is_model_generated());
        assert!((forecast.average_confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
        assert!(forecasts.is_empty().await, "fallback forecasts are not stored");
    }

    #[tokio::test]
    async fn malformed_reply_yields_baseline_of_requested_length() {
        let (runtime, _, _) = runtime_with(ForecastingClient::live(Arc::new(CannedClient(
            "I cannot produce a forecast today.".to_string(),
        ))));

        let error = runtime
            .try_generate(&request(ForecastPeriod::TwoWeeks), Utc::now())
            .await
            .expect_err("reply has no JSON");
        assert!(matches!(error, OrchestrationError::NoUsablePredictions { .. }));

        let forecast = runtime.generate(&request(ForecastPeriod::TwoWeeks)).await;
        assert_eq!(forecast.predictions.len(), 14);
        assert_eq!(forecast.source, ForecastSource::Fallback);
    }

    #[tokio::test]
    async fn short_reply_falls_back() {
        let (runtime, _, forecasts) =
            runtime_with(ForecastingClient::live(Arc::new(CannedClient(week_reply(3)))));

        let error = runtime
            .try_generate(&request(ForecastPeriod::Week), Utc::now())
            .await
            .expect_err("three of seven days");
        assert!(matches!(error, OrchestrationError::ShortForecast { expected: 7, actual: 3 }));
        assert!(forecasts.is_empty().await);
    }

    #[tokio::test]
    async fn model_forecast_is_truncated_and_stored() {
        let (runtime, _, forecasts) =
            runtime_with(ForecastingClient::live(Arc::new(CannedClient(week_reply(9)))));

        let forecast = runtime.generate(&request(ForecastPeriod::Week)).await;

        assert_eq!(forecast.source, ForecastSource::Model);
        assert!(forecast.source.is_model_generated());
        assert_eq!(forecast.predictions.len(), 7);
        assert_eq!(forecast.total_predicted_units, 28);
        assert_eq!(forecast.total_predicted_revenue, Decimal::new(84_000, 0));
        assert_eq!(forecast.explanation, "demand holds");
        assert_eq!(forecasts.len().await, 1);

        let history = runtime.forecast_history(&forecast.sku_id, 10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, ForecastSource::Model);
    }

    #[tokio::test]
    async fn mock_forecast_uses_history_and_is_stored() {
        let (runtime, sales, forecasts) = runtime_with(ForecastingClient::mock());
        sales
            .upsert_many(&[SalesRecord {
                sku_id: SkuId("PARKA".to_string()),
                date: NaiveDate::from_ymd_opt(2024, 1, 5).expect("valid date"),
                units_sold: 10,
                revenue: Decimal::new(30_000, 0),
                weather_temp: Some(-15.0),
                season: Some("winter".to_string()),
            }])
            .await
            .expect("seed");

        let now = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).single().expect("valid time");
        let forecast =
            runtime.try_generate(&request(ForecastPeriod::Month), now).await.expect("mock");

        assert_eq!(forecast.source, ForecastSource::Mock);
        assert_eq!(forecast.predictions.len(), 30);
        assert_eq!(forecast.predictions[0].predicted_units, 8);
        assert_eq!(forecast.generated_at, now);
        assert_eq!(forecasts.len().await, 1);
    }

    #[tokio::test]
    async fn mock_mode_without_history_is_not_the_fallback() {
        let (runtime, _, _) = runtime_with(ForecastingClient::mock());
        let forecast = runtime.generate(&request(ForecastPeriod::Week)).await;

        assert_eq!(forecast.source, ForecastSource::Mock);
        assert_eq!(forecast.predictions.len(), 7);
    }

    #[tokio::test]
    async fn persistence_failure_still_returns_the_forecast() {
        let sales = Arc::new(InMemorySalesRepository::default());
        let runtime =
            ForecastRuntime::new(sales, Arc::new(BrokenForecastStore), ForecastingClient::mock());

        let forecast = runtime.generate(&request(ForecastPeriod::Week)).await;
        assert_eq!(forecast.source, ForecastSource::Mock);

        let history = runtime.forecast_history(&SkuId("PARKA".to_string()), 10).await;
        assert!(history.is_empty(), "read failures degrade to an empty list");
    }

    #[tokio::test]
    async fn read_through_queries_return_stored_rows() {
        let (runtime, _, _) = runtime_with(ForecastingClient::mock());
        let outcome = runtime
            .import_csv(b"sku_id,date,units_sold,revenue\nB,2024-01-02,2,500\nA,2024-01-01,3,900\n")
            .await
            .expect("import");
        assert_eq!(outcome.rows_processed, 2);

        assert_eq!(
            runtime.sku_ids().await,
            vec![SkuId("A".to_string()), SkuId("B".to_string())]
        );
        let rows = runtime.sales_data(&SkuId("A".to_string()), 52).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].units_sold, 3);
    }
}
