use thiserror::Error;

use crate::domain::forecast::InvalidPeriod;
use crate::ingest::IngestError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    InvalidPeriod(#[from] InvalidPeriod),
    #[error("sku_id must not be blank")]
    BlankSku,
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange { field: &'static str, min: u32, max: u32, value: i64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Input(#[from] IngestError),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Caller-facing error. Client-side variants carry a message safe to return
/// verbatim; server-side variants carry internal detail that is only logged.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("payload too large: {message}")]
    PayloadTooLarge { message: String, correlation_id: String },
    #[error("unprocessable: {message}")]
    Unprocessable { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::PayloadTooLarge { .. } => "The uploaded file is too large.",
            Self::Unprocessable { .. } => "The request parameters are invalid.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    /// Detail for the caller, present only for client-correctable errors.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::BadRequest { message, .. }
            | Self::PayloadTooLarge { message, .. }
            | Self::Unprocessable { message, .. } => Some(message),
            Self::ServiceUnavailable { .. } | Self::Internal { .. } => None,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::PayloadTooLarge { correlation_id, .. }
            | Self::Unprocessable { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::PayloadTooLarge { correlation_id: id, .. }
            | InterfaceError::Unprocessable { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::Unprocessable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Input(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::InvalidUpload(message) => Self::BadRequest { message, correlation_id },
            error @ ApplicationError::PayloadTooLarge { .. } => {
                Self::PayloadTooLarge { message: error.to_string(), correlation_id }
            }
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Persistence(message) | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}
