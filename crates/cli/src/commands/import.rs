use std::fs;
use std::path::Path;

use salescast_agent::import_csv;
use salescast_core::errors::ApplicationError;
use salescast_db::SqlSalesRepository;

use crate::commands::{open_store, prepare, CommandResult, StepFailure};

/// Runs the CSV normalizer on `path` and upserts the valid rows.
pub fn run(path: &Path) -> CommandResult {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) => {
            return CommandResult::failure(
                "import",
                "file_read",
                format!("could not read `{}`: {error}", path.display()),
                6,
            );
        }
    };

    let (config, runtime) = match prepare("import") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_store(&config).await?;
        let outcome = import_csv(&SqlSalesRepository::new(pool.clone()), &bytes).await;
        pool.close().await;
        outcome.map_err(|error| -> StepFailure {
            match error {
                ApplicationError::Input(input) => ("invalid_input", input.to_string(), 7),
                other => ("persistence", other.to_string(), 8),
            }
        })
    });

    match result {
        Ok(outcome) => CommandResult::success_with(
            "import",
            format!(
                "imported {} of {} rows from {}",
                outcome.rows_processed,
                outcome.total_rows,
                path.display()
            ),
            serde_json::to_value(&outcome).ok(),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("import", error_class, message, exit_code)
        }
    }
}
