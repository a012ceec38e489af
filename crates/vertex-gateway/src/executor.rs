//! Resilient request executor
//!
//! Wraps one outbound call with cache lookup, retry with exponential backoff
//! and timing. The executor never panics and never propagates: every call
//! ends in either [`Executed`] or [`ExecutionFailure`], so batch and workflow
//! callers can keep going when one item fails.
//!
//! ```text
//! cache hit? ──yes──► Executed { cached: true }
//!     │ no
//!     ▼
//! attempt 1 ──ok──► write-through ──► Executed
//!     │ retryable error
//!     ▼  sleep base * 2^(n-1)
//! attempt n ... up to max_attempts ──► ExecutionFailure
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::error::UpstreamError;

/// Backoff schedule for transient upstream failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total tries, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles each time
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Single attempt, no waiting
    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait after failed attempt number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Successful execution
#[derive(Debug, Clone)]
pub struct Executed<T> {
    pub value: T,
    /// Served from the cache without a network call
    pub cached: bool,
    /// Network attempts made (0 on a cache hit)
    pub attempts: u32,
    pub duration: Duration,
}

/// Failed execution after retries were exhausted or a terminal error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub message: String,
    pub attempts: u32,
    /// The last error was transient (retries ran out)
    pub retryable: bool,
}

pub struct RequestExecutor {
    cache: Arc<dyn CacheStore>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self::with_policy(cache, RetryPolicy::default())
    }

    pub fn with_policy(cache: Arc<dyn CacheStore>, policy: RetryPolicy) -> Self {
        Self { cache, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Run `request_fn` with caching and retries
    ///
    /// Caching applies only when `use_cache` is set and a key is given. Only
    /// successful results are ever written to the cache.
    pub async fn execute<T, F, Fut>(
        &self,
        mut request_fn: F,
        cache_key: Option<&str>,
        use_cache: bool,
    ) -> Result<Executed<T>, ExecutionFailure>
    where
        T: Serialize + DeserializeOwned,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let started = Instant::now();
        let cache_key = cache_key.filter(|_| use_cache);

        if let Some(key) = cache_key {
            if let Some(hit) = self.cache.get(key).await {
                match serde_json::from_value::<T>(hit) {
                    Ok(value) => {
                        debug!(key, "Cache hit");
                        return Ok(Executed {
                            value,
                            cached: true,
                            attempts: 0,
                            duration: started.elapsed(),
                        });
                    }
                    Err(e) => debug!(key, error = %e, "Ignoring undecodable cache entry"),
                }
            }
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match request_fn().await {
                Ok(value) => {
                    if let Some(key) = cache_key {
                        match serde_json::to_value(&value) {
                            Ok(data) => self.cache.put(key, data).await,
                            Err(e) => warn!(key, error = %e, "Result not cacheable"),
                        }
                    }
                    let duration = started.elapsed();
                    info!(
                        attempts = attempt,
                        retries = attempt - 1,
                        duration_ms = duration.as_millis() as u64,
                        "Request succeeded"
                    );
                    return Ok(Executed {
                        value,
                        cached: false,
                        attempts: attempt,
                        duration,
                    });
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    if !retryable || attempt >= max_attempts {
                        warn!(
                            attempts = attempt,
                            retryable,
                            duration_ms = started.elapsed().as_millis() as u64,
                            error = %e,
                            "Request failed"
                        );
                        return Err(ExecutionFailure {
                            message: e.to_string(),
                            attempts: attempt,
                            retryable,
                        });
                    }

                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
