//! Deterministic baseline forecast.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::forecast::{Forecast, ForecastPrediction, ForecastRequest, ForecastSource};

/// Demand multipliers, in percent, repeating every three days.
pub const CYCLE_PERCENTAGES: [u32; 3] = [80, 95, 110];
pub const FALLBACK_BASE_UNITS: u32 = 3;
pub const FALLBACK_CONFIDENCE: f64 = 0.6;
pub const FALLBACK_EXPLANATION: &str = "The forecasting model is currently unavailable. This is a \
     baseline forecast built from a fixed three-day demand cycle and should be treated as indicative only.";

pub fn fallback_base_revenue() -> Decimal {
    Decimal::new(9_000, 0)
}

/// Units for the `day`-th forecast day (0-based); never below one.
pub fn cycle_units(base_units: f64, day: usize) -> u32 {
    let percent = f64::from(CYCLE_PERCENTAGES[day % CYCLE_PERCENTAGES.len()]);
    let units = (base_units * percent / 100.0).trunc();
    if units.is_finite() && units >= 1.0 {
        units.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

pub fn cycle_revenue(base_revenue: Decimal, day: usize) -> Decimal {
    let percent = CYCLE_PERCENTAGES[day % CYCLE_PERCENTAGES.len()];
    (base_revenue * Decimal::new(i64::from(percent), 2)).round_dp(2)
}

/// `count` consecutive dates starting the day after `now`.
pub fn forecast_dates(now: DateTime<Utc>, count: u32) -> impl Iterator<Item = NaiveDate> {
    let today = now.date_naive();
    (1..=i64::from(count)).map(move |offset| today + Duration::days(offset))
}

impl Forecast {
    /// Baseline forecast for `request`; cannot fail and is never persisted.
    pub fn fallback(request: &ForecastRequest, generated_at: DateTime<Utc>) -> Self {
        let base_units = f64::from(FALLBACK_BASE_UNITS);
        let base_revenue = fallback_base_revenue();

        let predictions = forecast_dates(generated_at, request.period.days())
            .enumerate()
            .map(|(day, date)| ForecastPrediction {
                date,
                predicted_units: cycle_units(base_units, day),
                predicted_revenue: cycle_revenue(base_revenue, day),
                confidence: FALLBACK_CONFIDENCE,
                predicted_temp: None,
            })
            .collect();

        Self::assemble(
            request.sku_id.clone(),
            request.period,
            generated_at,
            predictions,
            FALLBACK_EXPLANATION.to_string(),
            ForecastSource::Fallback,
        )
    }
}
