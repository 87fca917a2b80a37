use serde::Serialize;
use tracing::{error, info};

use salescast_core::errors::ApplicationError;
use salescast_core::ingest::normalize_csv;
use salescast_db::repositories::SalesRepository;

/// Result of one CSV import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub rows_processed: u64,
    pub total_rows: usize,
    pub rejected_rows: usize,
    /// Detected header mapping, e.g. `sku_id<-Product_ID, date<-Sales_Date`.
    pub column_mapping: String,
    /// Every row-level message, in file order.
    pub warnings: Vec<String>,
}

/// Normalizes `bytes` and upserts the surviving rows.
///
/// Input defects come back as [`ApplicationError::Input`]; a store failure
/// is [`ApplicationError::Persistence`] and nothing is reported as written.
pub async fn import_csv(
    sales: &dyn SalesRepository,
    bytes: &[u8],
) -> Result<ImportOutcome, ApplicationError> {
    let upload = normalize_csv(bytes)?;
    let column_mapping = upload.mapping.describe();

    let rows_processed = sales.upsert_many(&upload.records).await.map_err(|repo_error| {
        error!(
            event_name = "ingest.csv.store_failed",
            rows = upload.records.len(),
            error = %repo_error,
            "failed to store uploaded sales rows"
        );
        ApplicationError::Persistence(repo_error.to_string())
    })?;

    info!(
        event_name = "ingest.csv.completed",
        rows_processed,
        total_rows = upload.total_rows,
        rejected_rows = upload.rejected_rows(),
        issues = upload.issues.len(),
        delimiter = %upload.delimiter,
        columns = %column_mapping,
        "sales CSV imported"
    );

    Ok(ImportOutcome {
        rows_processed,
        total_rows: upload.total_rows,
        rejected_rows: upload.rejected_rows(),
        column_mapping,
        warnings: upload.messages(),
    })
}
