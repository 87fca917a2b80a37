//! Forecasting runtime for salescast.
//!
//! - `auth`: OAuth token cache and retry policy for the forecasting vendor
//! - `llm`: the `LlmClient` seam and the chat-completion client behind it
//! - `forecaster`: live model calls or local mock synthesis
//! - `runtime`: the forecast orchestrator, CSV import and read-through queries
//!
//! The model only proposes numbers. Validation, the length contract and the
//! baseline fallback are decided here, deterministically.

pub mod auth;
pub mod forecaster;
pub mod ingest;
pub mod llm;
pub mod runtime;

pub use forecaster::{ForecastingClient, ForecastingMode, ModelOutput};
pub use ingest::{import_csv, ImportOutcome};
pub use llm::{ChatCompletionClient, CompletionError, LlmClient};
pub use runtime::{ForecastRuntime, OrchestrationError};
