use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::sales::SkuId;

/// Forecast horizon. Only 7, 14 and 30 days are offered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "u32")]
pub enum ForecastPeriod {
    Week,
    TwoWeeks,
    Month,
}

impl ForecastPeriod {
    pub const ALL: [ForecastPeriod; 3] = [Self::Week, Self::TwoWeeks, Self::Month];

    pub fn days(self) -> u32 {
        match self {
            Self::Week => 7,
            Self::TwoWeeks => 14,
            Self::Month => 30,
        }
    }
}

impl From<ForecastPeriod> for u32 {
    fn from(value: ForecastPeriod) -> Self {
        value.days()
    }
}

impl TryFrom<u32> for ForecastPeriod {
    type Error = InvalidPeriod;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(Self::Week),
            14 => Ok(Self::TwoWeeks),
            30 => Ok(Self::Month),
            other => Err(InvalidPeriod(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("forecast period must be one of 7, 14 or 30 days (got `{0}`)")]
pub struct InvalidPeriod(pub String);

/// Accepts both `7` and `"7"` on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPeriod {
    Number(u32),
    Text(String),
}

impl TryFrom<RawPeriod> for ForecastPeriod {
    type Error = InvalidPeriod;

    fn try_from(value: RawPeriod) -> Result<Self, Self::Error> {
        match value {
            RawPeriod::Number(days) => Self::try_from(days),
            RawPeriod::Text(text) => match text.trim().parse::<u32>() {
                Ok(days) => Self::try_from(days),
                Err(_) => Err(InvalidPeriod(text)),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub sku_id: SkuId,
    pub period: ForecastPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastPrediction {
    pub date: NaiveDate,
    pub predicted_units: u32,
    pub predicted_revenue: Decimal,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_temp: Option<f64>,
}

/// Where a forecast came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    /// Produced by the remote text-generation model.
    Model,
    /// Synthesized locally because no vendor credentials are configured.
    Mock,
    /// Deterministic baseline used after a failure anywhere in the pipeline.
    Fallback,
}

impl ForecastSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Mock => "mock",
            Self::Fallback => "fallback",
        }
    }

    pub fn is_model_generated(self) -> bool {
        matches!(self, Self::Model)
    }
}

impl std::str::FromStr for ForecastSource {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "model" => Ok(Self::Model),
            "mock" => Ok(Self::Mock),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("unknown forecast source `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub sku_id: SkuId,
    pub forecast_period: u32,
    pub generated_at: DateTime<Utc>,
    pub predictions: Vec<ForecastPrediction>,
    pub total_predicted_units: u64,
    pub total_predicted_revenue: Decimal,
    pub average_confidence: f64,
    pub explanation: String,
    pub source: ForecastSource,
}

impl Forecast {
    /// Builds a forecast and derives its totals from `predictions`.
    pub fn assemble(
        sku_id: SkuId,
        period: ForecastPeriod,
        generated_at: DateTime<Utc>,
        predictions: Vec<ForecastPrediction>,
        explanation: String,
        source: ForecastSource,
    ) -> Self {
        let total_predicted_units =
            predictions.iter().map(|prediction| u64::from(prediction.predicted_units)).sum();
        let total_predicted_revenue =
            predictions.iter().map(|prediction| prediction.predicted_revenue).sum();
        let average_confidence = if predictions.is_empty() {
            0.0
        } else {
            predictions.iter().map(|prediction| prediction.confidence).sum::<f64>()
                / predictions.len() as f64
        };

        Self {
            sku_id,
            forecast_period: period.days(),
            generated_at,
            predictions,
            total_predicted_units,
            total_predicted_revenue,
            average_confidence,
            explanation,
            source,
        }
    }
}

/// Summary row of a persisted forecast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastHistoryItem {
    pub id: i64,
    pub sku_id: SkuId,
    pub forecast_period: u32,
    pub generated_at: DateTime<Utc>,
    pub total_predicted_units: u64,
    pub total_predicted_revenue: Decimal,
    pub average_confidence: f64,
    pub explanation: Option<String>,
    pub source: ForecastSource,
}
