//! Pure forecasting logic shared by the orchestrator and the model client.

pub mod fallback;
pub mod prompt;
pub mod reply;
pub mod summary;

pub use fallback::{cycle_revenue, cycle_units, forecast_dates, FALLBACK_CONFIDENCE};
pub use prompt::build_prompt;
pub use reply::{parse_reply, ForecastReply};
pub use summary::{HistorySummary, Trend};

/// Most-recent records fetched as forecasting context.
pub const HISTORY_WINDOW: u32 = 52;
