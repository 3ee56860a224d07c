use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bazaar_order::WorkflowError;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("Some products are invalid or inactive")]
    InvalidItems(Vec<Uuid>),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    UpstreamError(String),
    #[error("{0}")]
    UnavailableError(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::AuthorizationError(_) => StatusCode::FORBIDDEN,
            AppError::ValidationError(_) | AppError::InvalidItems(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::ConflictError(_) => StatusCode::CONFLICT,
            AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            AppError::UnavailableError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::InvalidItems(ids) => json!({
                "error": "Some products are invalid or inactive",
                "invalidProductIds": ids,
            }),
            AppError::UpstreamError(msg) => {
                tracing::error!("Upstream failure: {}", msg);
                json!({ "error": msg })
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                json!({ "error": "Internal Server Error" })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(msg) => AppError::ValidationError(msg),
            WorkflowError::SignatureInvalid => AppError::ValidationError(err.to_string()),
            WorkflowError::InvalidItems(ids) => AppError::InvalidItems(ids),
            WorkflowError::NotFound(msg) => AppError::NotFoundError(msg),
            WorkflowError::InvalidTransition { .. } => AppError::ConflictError(err.to_string()),
            WorkflowError::Upstream { .. } => AppError::UpstreamError(err.to_string()),
            WorkflowError::Unconfigured(_) => AppError::UnavailableError(err.to_string()),
            WorkflowError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
