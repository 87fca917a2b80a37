use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::sales::SalesRecord;

/// Records on each side of the trend comparison.
pub const TREND_WINDOW: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
    Unknown,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Stable => "stable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregates over the fetched history window.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistorySummary {
    pub record_count: usize,
    pub total_units: u64,
    pub total_revenue: Decimal,
    pub mean_units: f64,
    pub mean_revenue: Decimal,
    pub trend: Trend,
}

impl HistorySummary {
    /// `records` must be ordered most-recent-first. An empty window yields
    /// zeroed statistics and [`Trend::Unknown`].
    pub fn from_records(records: &[SalesRecord]) -> Self {
        if records.is_empty() {
            return Self {
                record_count: 0,
                total_units: 0,
                total_revenue: Decimal::ZERO,
                mean_units: 0.0,
                mean_revenue: Decimal::ZERO,
                trend: Trend::Unknown,
            };
        }

        let record_count = records.len();
        let total_units: u64 = records.iter().map(|record| u64::from(record.units_sold)).sum();
        let total_revenue: Decimal = records.iter().map(|record| record.revenue).sum();

        Self {
            record_count,
            total_units,
            total_revenue,
            mean_units: total_units as f64 / record_count as f64,
            mean_revenue: (total_revenue / Decimal::from(record_count)).round_dp(2),
            trend: trend_of(records),
        }
    }
}

fn trend_of(records: &[SalesRecord]) -> Trend {
    let split = records.len().min(TREND_WINDOW);
    let (recent, rest) = records.split_at(split);
    let older = &rest[..rest.len().min(TREND_WINDOW)];

    let Some(recent_mean) = mean_units(recent) else {
        return Trend::Unknown;
    };
    let Some(older_mean) = mean_units(older) else {
        return Trend::Stable;
    };

    if recent_mean > older_mean {
        Trend::Rising
    } else if recent_mean < older_mean {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

fn mean_units(records: &[SalesRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: u64 = records.iter().map(|record| u64::from(record.units_sold)).sum();
    Some(total as f64 / records.len() as f64)
}
