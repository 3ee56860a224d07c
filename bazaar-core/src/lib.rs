pub mod address;
pub mod payment;
pub mod shipping;
pub mod repository;

pub use address::{AddressType, DeliverTo, UserAddress};

/// Error type returned by repository implementations.
pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// Failure talking to a third-party integration (payment gateway, carrier).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrationError {
    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} request failed: {message}")]
    Transport { service: &'static str, message: String },

    #[error("{service} returned status {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode { service: &'static str, message: String },
}

impl IntegrationError {
    pub fn service(&self) -> &'static str {
        match self {
            IntegrationError::Unconfigured(service) => service,
            IntegrationError::Timeout { service }
            | IntegrationError::Transport { service, .. }
            | IntegrationError::Api { service, .. }
            | IntegrationError::Decode { service, .. } => service,
        }
    }

    /// Timeouts and connection failures. Only idempotent reads may retry these.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IntegrationError::Timeout { .. } | IntegrationError::Transport { .. }
        )
    }
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;
