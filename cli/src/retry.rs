//! Bounded retry layered over a [`MusicGenerator`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::warn;

use crate::{client::MusicGenerator, types::GenerationRequest, GenerationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }

    /// Delay before retry number `attempt` (zero-based), doubling up to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Retries transient failures (timeouts and refused connections) only.
pub struct Retrying<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: MusicGenerator> Retrying<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    async fn run<'a, F, Fut>(&'a self, operation: &str, mut call: F) -> GenerationResult
    where
        F: FnMut(&'a G) -> Fut + Send,
        Fut: std::future::Future<Output = GenerationResult> + Send,
    {
        let mut attempt = 0;
        loop {
            match call(&self.inner).await {
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    attempt += 1;
                    warn!(operation, attempt, ?delay, error = %err, "retrying after transient failure");
                    sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}

#[async_trait]
impl<G: MusicGenerator> MusicGenerator for Retrying<G> {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        self.run("generate", |inner| inner.generate(request)).await
    }

    async fn fetch_status(&self, ids: &[String]) -> GenerationResult {
        self.run("fetch_status", |inner| inner.fetch_status(ids)).await
    }
}
