use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use impactree_core::ImpactError;

/// An HTTP error response with body `{"message": ...}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<ImpactError> for AppError {
    fn from(err: ImpactError) -> Self {
        let status = match &err {
            ImpactError::Validation(_)
            | ImpactError::DuplicatePlan
            | ImpactError::DuplicateAllocation
            | ImpactError::MissingField(_)
            | ImpactError::ImmutableOwner => StatusCode::BAD_REQUEST,
            ImpactError::Unauthorized => StatusCode::UNAUTHORIZED,
            ImpactError::Forbidden(_) => StatusCode::FORBIDDEN,
            ImpactError::NotFound(_) | ImpactError::NoPlanForUser => StatusCode::NOT_FOUND,
            ImpactError::Internal(inner) => {
                error!(error = %format!("{inner:#}"), "request failed");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "message": self.message });
        (self.status, Json(body)).into_response()
    }
}
