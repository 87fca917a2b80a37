pub mod config;
pub mod domain;
pub mod errors;
pub mod forecast;
pub mod ingest;

pub use domain::forecast::{
    Forecast, ForecastHistoryItem, ForecastPeriod, ForecastPrediction, ForecastRequest,
    ForecastSource, InvalidPeriod,
};
pub use domain::sales::{SalesRecord, SkuId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ingest::{normalize_csv, IngestError, IssueSeverity, NormalizedUpload, RowIssue};
