use salescast_core::ingest::sample_csv;

use crate::commands::CommandResult;

/// Prints the sample upload file verbatim so it can be redirected to disk.
pub fn run() -> CommandResult {
    CommandResult { exit_code: 0, output: sample_csv() }
}
