use bazaar_core::IntegrationResult;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// Process-wide bearer token with get-or-refresh semantics.
///
/// The lock is held across the refresh, so concurrent callers that find the
/// token stale wait for one login instead of each issuing their own.
pub struct TokenCache {
    validity: Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(validity: Duration) -> Self {
        Self {
            validity,
            slot: Mutex::new(None),
        }
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> IntegrationResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = IntegrationResult<String>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.fetched_at.elapsed() < self.validity {
                return Ok(cached.token.clone());
            }
        }

        tracing::debug!("Refreshing carrier token");
        let token = refresh().await?;
        *slot = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }

    /// Drop the cached token, e.g. after the provider rejected it.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}
