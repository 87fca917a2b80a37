use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use salescast_core::errors::{ApplicationError, InterfaceError};

pub fn new_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    detail: Option<&'a str>,
    correlation_id: &'a str,
}

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        match &error {
            ApplicationError::Persistence(_)
            | ApplicationError::Integration(_)
            | ApplicationError::Configuration(_) => error!(
                event_name = "api.request.failed",
                correlation_id,
                error = %error,
                "request failed"
            ),
            _ => info!(
                event_name = "api.request.rejected",
                correlation_id,
                error = %error,
                "request rejected"
            ),
        }
        Self(error.into_interface(correlation_id))
    }

    /// Extractor rejections from axum; a 422 stays a 422, anything else is a
    /// bad request.
    pub fn rejected(status: StatusCode, message: String, correlation_id: &str) -> Self {
        info!(
            event_name = "api.request.rejected",
            correlation_id,
            status = status.as_u16(),
            error = %message,
            "request rejected by extractor"
        );
        let correlation_id = correlation_id.to_string();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            Self(InterfaceError::Unprocessable { message, correlation_id })
        } else {
            Self(InterfaceError::BadRequest { message, correlation_id })
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            InterfaceError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.user_message(),
            detail: self.0.detail(),
            correlation_id: self.0.correlation_id(),
        };
        (self.status(), Json(body)).into_response()
    }
}
