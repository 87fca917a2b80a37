use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use salescast_core::config::LlmConfig;
use salescast_core::domain::forecast::{ForecastPrediction, ForecastRequest, ForecastSource};
use salescast_core::domain::sales::SalesRecord;
use salescast_core::forecast::fallback::{fallback_base_revenue, FALLBACK_BASE_UNITS};
use salescast_core::forecast::{
    build_prompt, cycle_revenue, cycle_units, forecast_dates, parse_reply, HistorySummary,
};

use crate::llm::{ChatCompletionClient, CompletionError, LlmClient};

const MOCK_CONFIDENCE: [f64; 2] = [0.75, 0.85];
const MOCK_FIRST_TEMP: f64 = -20.0;
const MOCK_TEMP_SPAN: f64 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForecastingMode {
    Live,
    Mock,
}

impl ForecastingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
        }
    }
}

/// Predictions as produced by the model (or the local mock), before any
/// length checks.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOutput {
    pub source: ForecastSource,
    pub predictions: Vec<ForecastPrediction>,
    pub explanation: String,
}

#[derive(Clone)]
pub struct ForecastingClient {
    llm: Option<Arc<dyn LlmClient>>,
}

impl ForecastingClient {
    pub fn mock() -> Self {
        Self { llm: None }
    }

    pub fn live(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// Live when any credential mode is configured, mock otherwise.
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        if config.is_mock() {
            info!(event_name = "llm.mode.selected", mode = "mock", "no vendor credentials configured");
            return Ok(Self::mock());
        }

        let client = ChatCompletionClient::from_config(config)?;
        info!(
            event_name = "llm.mode.selected",
            mode = "live",
            model = %config.model,
            "forecasting model client ready"
        );
        Ok(Self::live(Arc::new(client)))
    }

    pub fn mode(&self) -> ForecastingMode {
        if self.llm.is_some() {
            ForecastingMode::Live
        } else {
            ForecastingMode::Mock
        }
    }

    /// `history` is most-recent-first. The returned predictions may be
    /// empty or shorter than the requested period when the model misbehaves.
    pub async fn forecast(
        &self,
        request: &ForecastRequest,
        history: &[SalesRecord],
        summary: &HistorySummary,
        now: DateTime<Utc>,
    ) -> Result<ModelOutput> {
        let Some(llm) = &self.llm else {
            return Ok(mock_output(request, summary, now));
        };

        let first_day = forecast_dates(now, 1).next().unwrap_or_else(|| now.date_naive());
        let prompt = build_prompt(request, history, summary, first_day);
        let raw = llm.complete(&prompt).await?;
        let reply = parse_reply(&raw);

        Ok(ModelOutput {
            source: ForecastSource::Model,
            predictions: reply.predictions(),
            explanation: reply.explanation,
        })
    }
}

fn mock_output(request: &ForecastRequest, summary: &HistorySummary, now: DateTime<Utc>) -> ModelOutput {
    let days = request.period.days();
    let (base_units, base_revenue) = if summary.record_count > 0 {
        (summary.mean_units, summary.mean_revenue)
    } else {
        (f64::from(FALLBACK_BASE_UNITS), fallback_base_revenue())
    };
    let temp_step = MOCK_TEMP_SPAN / f64::from(days.saturating_sub(1).max(1));

    let predictions = forecast_dates(now, days)
        .enumerate()
        .map(|(day, date)| ForecastPrediction {
            date,
            predicted_units: cycle_units(base_units, day),
            predicted_revenue: cycle_revenue(base_revenue, day),
            confidence: MOCK_CONFIDENCE[day % MOCK_CONFIDENCE.len()],
            predicted_temp: Some(round_tenths(MOCK_FIRST_TEMP + temp_step * day as f64)),
        })
        .collect();

    ModelOutput {
        source: ForecastSource::Mock,
        predictions,
        explanation: format!(
            "mock forecast: no model credentials are configured, so {days} days were synthesized \
             from an average of {base_units:.1} units and {base_revenue:.2} revenue per day \
             with a three-day demand cycle"
        ),
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
