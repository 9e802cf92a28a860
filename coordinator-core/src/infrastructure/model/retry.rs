//! Retrying wrapper around any model provider.

use super::traits::ModelProvider;
use super::types::{ModelError, ModelRequest, ModelResponse};
use crate::config::RetryConfig;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Retries transient HTTP failures with exponential backoff.
pub struct RetryingProvider<P> {
    inner: P,
    policy: RetryConfig,
}

impl<P: ModelProvider> RetryingProvider<P> {
    pub fn new(inner: P, policy: RetryConfig) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for RetryingProvider<P> {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(attempt, "Model call succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(err) => {
                    let retryable = err
                        .http_status()
                        .is_some_and(|status| self.policy.retries_status(status));
                    if !retryable || attempt >= attempts {
                        return Err(err);
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient model error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
