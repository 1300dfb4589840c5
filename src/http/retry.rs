//! Caller-side retry with exponential backoff.
//!
//! The adapter never retries on its own. Callers that want retries wrap
//! `execute` with [`send_with_retry`], which only retries errors that
//! [`NetError::is_retryable`] reports.

use crate::base::neterror::NetError;
use crate::http::request::LogicalRequest;
use crate::http::response::TransportResponse;
use crate::transport::TransportAdapter;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    pub max_attempts: usize,
    /// Base delay for exponential backoff in milliseconds (default: 100)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 5000)
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) to spread out delays (default: 0.1)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Create a config with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}

/// Calculate backoff delay for a given attempt.
///
/// Uses exponential backoff: `base_delay * 2^(attempt-1)`, capped at
/// `max_delay_ms`.
pub fn calculate_backoff(attempt: usize, config: &RetryConfig) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let delay_ms = config
        .base_delay_ms
        .saturating_mul(1 << (attempt - 1).min(10));
    let capped_ms = delay_ms.min(config.max_delay_ms);

    let jitter_range = (capped_ms as f64 * config.jitter_factor) as u64;
    let jittered_ms = if jitter_range > 0 {
        // Deterministic jitter keyed on the attempt number
        let jitter = (attempt as u64 * 7) % jitter_range;
        capped_ms.saturating_add(jitter)
    } else {
        capped_ms
    };

    Duration::from_millis(jittered_ms)
}

/// Check if we should retry based on attempt count.
pub fn should_retry(attempt: usize, config: &RetryConfig) -> bool {
    attempt < config.max_attempts
}

/// Execute `request`, retrying transient failures.
///
/// Non-retryable errors are returned as soon as they occur. When every
/// attempt fails with a retryable error the result is
/// [`NetError::TooManyRetries`], unless retries are disabled, in which case
/// the single error is returned unchanged.
pub async fn send_with_retry(
    adapter: &TransportAdapter,
    request: &LogicalRequest,
    config: &RetryConfig,
) -> Result<TransportResponse, NetError> {
    let mut attempt = 0;
    loop {
        match adapter.execute(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if !should_retry(attempt, config) => {
                if config.max_attempts == 0 {
                    return Err(e);
                }
                tracing::warn!(
                    url = %request.url(),
                    attempts = attempt + 1,
                    error = %e,
                    "giving up after retries"
                );
                return Err(NetError::TooManyRetries);
            }
            Err(e) => {
                attempt += 1;
                let delay = calculate_backoff(attempt, config);
                tracing::debug!(
                    url = %request.url(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
