use crate::models::OrderStatus;
use bazaar_catalog::LineError;
use bazaar_core::{IntegrationError, RepoError};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Some products are invalid or inactive")]
    InvalidItems(Vec<Uuid>),

    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    #[error("Payment signature verification failed")]
    SignatureInvalid,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<LineError> for WorkflowError {
    fn from(e: LineError) -> Self {
        match e {
            LineError::InvalidItems(ids) => WorkflowError::InvalidItems(ids),
            other => WorkflowError::Validation(other.to_string()),
        }
    }
}

impl From<IntegrationError> for WorkflowError {
    fn from(e: IntegrationError) -> Self {
        match e {
            IntegrationError::Unconfigured(service) => WorkflowError::Unconfigured(service),
            other => WorkflowError::Upstream {
                service: other.service(),
                message: other.to_string(),
            },
        }
    }
}

impl From<RepoError> for WorkflowError {
    fn from(e: RepoError) -> Self {
        WorkflowError::Storage(e.to_string())
    }
}
