//! Bounded fixed-delay retry around a single upstream call.

use std::future::Future;
use std::time::Duration;

use osint_models::{Operation, ProviderId, RetryConfig};
use tracing::{debug, warn};

use crate::error::{classify, BoxError, ErrorCode, ProviderError};

/// Identifies the call being retried, for classification and tracing.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub provider: ProviderId,
    pub model_id: String,
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub retries: u32,
    pub delay: Duration,
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(2000),
            attempt_timeout: Some(Duration::from_secs(90)),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            retries: config.retries,
            delay: Duration::from_millis(config.delay_ms),
            attempt_timeout: config.attempt_timeout_seconds.map(Duration::from_secs),
        }
    }
}

impl RetryPolicy {
    /// Run `attempt` until it succeeds, fails with a non-retryable code, or the
    /// retry budget is spent. `attempt` receives the zero-based attempt index.
    pub async fn run<T, E, F, Fut>(&self, ctx: &CallContext, mut attempt: F) -> Result<T, ProviderError>
    where
        E: Into<BoxError>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_error = None;

        for index in 0..=self.retries {
            if index > 0 {
                tokio::time::sleep(self.delay).await;
            }

            let outcome = match self.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, attempt(index)).await {
                    Ok(result) => result.map_err(|e| classify(e.into(), ctx.provider, ctx.operation)),
                    Err(_) => Err(ProviderError::new(
                        ErrorCode::UpstreamError,
                        ctx.provider,
                        ctx.operation,
                        format!("attempt timed out after {}s", limit.as_secs()),
                    )),
                },
                None => attempt(index)
                    .await
                    .map_err(|e| classify(e.into(), ctx.provider, ctx.operation)),
            };

            match outcome {
                Ok(value) => {
                    debug!(
                        provider = %ctx.provider,
                        model_id = %ctx.model_id,
                        operation = %ctx.operation,
                        attempt = index,
                        "upstream call succeeded"
                    );
                    return Ok(value);
                }
                Err(err) => {
                    debug!(
                        provider = %ctx.provider,
                        model_id = %ctx.model_id,
                        operation = %ctx.operation,
                        attempt = index,
                        code = %err.code(),
                        message = %err.message(),
                        "upstream call failed"
                    );
                    if !err.code().is_retryable() {
                        return Err(err);
                    }
                    if index < self.retries {
                        warn!(
                            provider = %ctx.provider,
                            code = %err.code(),
                            next_attempt = index + 1,
                            "retrying upstream call"
                        );
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::new(
                ErrorCode::UpstreamError,
                ctx.provider,
                ctx.operation,
                "retry loop exhausted unexpectedly",
            )
        }))
    }
}
