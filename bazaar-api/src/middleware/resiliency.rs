use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::state::AppState;

const FAILURE_THRESHOLD: usize = 5;
const RESET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    /// Probing whether the upstream is back.
    HalfOpen,
}

pub struct CircuitBreaker {
    pub name: String,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(name: &str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold,
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    /// Whether a request may go through right now.
    pub async fn check(&self) -> bool {
        let state = *self.state.read().await;
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = self
                    .last_failure
                    .read()
                    .await
                    .is_some_and(|at| at.elapsed() > self.reset_timeout);
                if !cooled_down {
                    return false;
                }

                // Another request may have moved the breaker since the read.
                let mut state = self.state.write().await;
                if *state == CircuitState::Open {
                    *state = CircuitState::HalfOpen;
                    tracing::info!("Circuit breaker [{}] moving to half-open", self.name);
                }
                true
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        if *state == CircuitState::HalfOpen {
            *state = CircuitState::Closed;
            tracing::info!("Circuit breaker [{}] recovered", self.name);
        }
        self.failure_count.store(0, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            *state = CircuitState::Open;
            *self.last_failure.write().await = Some(Instant::now());
            tracing::error!("Circuit breaker [{}] opened after {} failures", self.name, count);
        }
    }
}

/// One breaker per third-party integration.
pub struct Resiliency {
    pub payment: CircuitBreaker,
    pub carrier: CircuitBreaker,
}

impl Default for Resiliency {
    fn default() -> Self {
        Self {
            payment: CircuitBreaker::new("payment-gateway", FAILURE_THRESHOLD, RESET_TIMEOUT),
            carrier: CircuitBreaker::new("shipping-carrier", FAILURE_THRESHOLD, RESET_TIMEOUT),
        }
    }
}

impl Resiliency {
    /// Breaker guarding the integration a path calls, if any.
    pub fn for_path(&self, path: &str) -> Option<&CircuitBreaker> {
        if path.starts_with("/v1/payments") {
            Some(&self.payment)
        } else if path.starts_with("/v1/shipping/track")
            || path.ends_with("/create-shipment")
            || path.ends_with("/generate-label")
            || path.ends_with("/request-pickup")
        {
            Some(&self.carrier)
        } else {
            None
        }
    }
}

/// Only failures of the upstream itself count against a breaker; a bad
/// request or an unconfigured integration does not.
fn is_upstream_failure(status: StatusCode) -> bool {
    status == StatusCode::BAD_GATEWAY || status == StatusCode::GATEWAY_TIMEOUT
}

pub async fn circuit_breaker_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(cb) = state.resiliency.for_path(req.uri().path()) else {
        return next.run(req).await;
    };

    if !cb.check().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": format!("{} is temporarily unavailable", cb.name) })),
        )
            .into_response();
    }

    let response = next.run(req).await;
    if is_upstream_failure(response.status()) {
        cb.record_failure().await;
    } else if response.status().is_success() {
        cb.record_success().await;
    }
    response
}
