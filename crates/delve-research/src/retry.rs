//! Retry with exponential backoff around collaborator calls

use std::{future::Future, time::Duration};

use async_trait::async_trait;

use crate::{
    error::Result,
    lookup::Lookup,
    reasoner::Reasoner,
    state::SearchResult,
};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt (0-indexed). A multiplier below
    /// 1 or not finite is treated as 1, so delays never shrink or go negative.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = if self.backoff_multiplier.is_finite() {
            self.backoff_multiplier.max(1.0)
        } else {
            1.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
            .unwrap_or(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// retries run out. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        label,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A [`Reasoner`] that retries transient failures of the wrapped one
pub struct RetryingReasoner<R> {
    inner: R,
    config: RetryConfig,
}

impl<R: Reasoner> RetryingReasoner<R> {
    pub fn new(inner: R, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: Reasoner> Reasoner for RetryingReasoner<R> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.config
            .run("Reasoning request", || self.inner.complete(prompt))
            .await
    }
}

/// A [`Lookup`] that retries transient failures of the wrapped one
pub struct RetryingLookup<L> {
    inner: L,
    config: RetryConfig,
}

impl<L: Lookup> RetryingLookup<L> {
    pub fn new(inner: L, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl<L: Lookup> Lookup for RetryingLookup<L> {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.config
            .run("Search request", || self.inner.search(query))
            .await
    }
}
