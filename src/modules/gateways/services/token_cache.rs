use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::core::Result;

/// Bearer credential issued by the gateway's authorization endpoint
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: String, expires_in: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Caches one access token per gateway client.
///
/// Valid-token reads share the read lock; refreshes are serialized by a separate
/// mutex so concurrent callers on an expired token trigger a single fetch.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: RwLock<Option<AccessToken>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token if present and not expired
    pub async fn cached(&self) -> Option<String> {
        let guard = self.current.read().await;
        guard
            .as_ref()
            .filter(|token| token.is_valid())
            .map(|token| token.value.clone())
    }

    /// Return the cached token, or fetch and store a fresh one.
    ///
    /// A failed fetch leaves the cache untouched.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _refreshing = self.refresh.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let token = fetch().await?;
        let value = token.value.clone();
        *self.current.write().await = Some(token);

        tracing::debug!("Gateway access token refreshed");
        Ok(value)
    }

    /// Drop the cached token
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}
