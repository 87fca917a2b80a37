use async_trait::async_trait;
use thiserror::Error;

use salescast_core::domain::forecast::{Forecast, ForecastHistoryItem};
use salescast_core::domain::sales::{SalesRecord, SkuId};

pub mod forecast;
pub mod memory;
pub mod sales;

pub use forecast::SqlForecastRepository;
pub use memory::{InMemoryForecastRepository, InMemorySalesRepository};
pub use sales::SqlSalesRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Sales history keyed by `(sku_id, date)`.
#[async_trait]
pub trait SalesRepository: Send + Sync {
    /// Inserts new rows and overwrites units, revenue, temperature and season
    /// of existing ones. Returns the number of rows written.
    async fn upsert_many(&self, records: &[SalesRecord]) -> Result<u64, RepositoryError>;

    /// Up to `limit` rows for the SKU, most recent first.
    async fn recent_for_sku(
        &self,
        sku_id: &SkuId,
        limit: u32,
    ) -> Result<Vec<SalesRecord>, RepositoryError>;

    /// Distinct SKU ids, sorted.
    async fn list_sku_ids(&self) -> Result<Vec<SkuId>, RepositoryError>;
}

#[async_trait]
pub trait ForecastRepository: Send + Sync {
    /// Stores the forecast and returns its assigned id.
    async fn insert(&self, forecast: &Forecast) -> Result<i64, RepositoryError>;

    /// Up to `limit` stored forecasts for the SKU, newest first.
    async fn history_for_sku(
        &self,
        sku_id: &SkuId,
        limit: u32,
    ) -> Result<Vec<ForecastHistoryItem>, RepositoryError>;
}
