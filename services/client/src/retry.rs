//! services/client/src/retry.rs
//!
//! Bounded retry of transient submission failures. The same request, and therefore the
//! same idempotency key, is resent on every attempt.

use adhd_game_core::{
    CompletionRequest, CompletionResponse, QuestId, SubmissionChannel, SubmissionResult,
    UserContext,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }
}

impl RetryConfig {
    /// Default backoff with a caller-chosen attempt bound (at least one attempt).
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    fn delay(&self, backoff: Duration) -> Duration {
        match self.jitter_max {
            Some(jitter_max) => {
                let jitter_ms = jitter_max.as_millis() as u64;
                let extra = if jitter_ms == 0 {
                    0
                } else {
                    rand::random::<u64>() % (jitter_ms + 1)
                };
                backoff + Duration::from_millis(extra)
            }
            None => backoff,
        }
    }
}

/// Wraps a submission channel and retries its transient failures with exponential
/// backoff. Terminal failures are returned on the first occurrence.
pub struct RetryingChannel<C> {
    inner: C,
    config: RetryConfig,
}

impl<C> RetryingChannel<C> {
    pub fn new(inner: C, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: SubmissionChannel> SubmissionChannel for RetryingChannel<C> {
    async fn submit_completion(
        &self,
        user: &UserContext,
        quest_id: &QuestId,
        request: &CompletionRequest,
    ) -> SubmissionResult<CompletionResponse> {
        let mut attempts_left = self.config.max_attempts.max(1);
        let mut backoff = self.config.base_backoff;

        loop {
            match self.inner.submit_completion(user, quest_id, request).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_transient() => {
                    attempts_left = attempts_left.saturating_sub(1);
                    if attempts_left == 0 {
                        return Err(error);
                    }
                    warn!(
                        "Transient failure submitting {} ({} attempts left): {}",
                        quest_id, attempts_left, error
                    );
                    tokio::time::sleep(self.config.delay(backoff)).await;
                    backoff = std::cmp::min(backoff * 2, self.config.max_backoff);
                }
                Err(error) => return Err(error),
            }
        }
    }
}
