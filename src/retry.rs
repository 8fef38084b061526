use crate::errors::ErrorClass;
use crate::models::JournalConfig;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Transient failures outlasted the retry limit. The last underlying
    /// error is deliberately dropped.
    #[error("RETRY_EXHAUSTED: store stayed busy for {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("{0}")]
    Fatal(E),
}

/// Fixed-delay retry for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub limit: u32,
    pub base_delay: Duration,
    /// 1 for local notebooks; remote notebooks wait longer between tries.
    pub latency_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: 5,
            base_delay: Duration::from_millis(500),
            latency_factor: 1,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &JournalConfig) -> Self {
        Self {
            limit: config.retry_limit,
            base_delay: config.retry_base_delay(),
            latency_factor: config.latency_factor(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.base_delay.saturating_mul(self.latency_factor.max(1))
    }

    /// Runs `operation` until it succeeds, fails fatally, or has failed
    /// transiently more than `limit` times.
    pub async fn run<T, E, F, Fut, C>(&self, mut operation: F, classify: C) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> ErrorClass,
        E: std::fmt::Display,
    {
        let mut retries = 0_u32;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if classify(&error) == ErrorClass::Fatal {
                return Err(RetryError::Fatal(error));
            }

            retries += 1;
            if retries > self.limit {
                tracing::warn!(attempts = retries, error = %error, "transient failures exhausted retry budget");
                return Err(RetryError::Exhausted { attempts: retries });
            }

            let delay = self.delay();
            tracing::debug!(
                attempt = retries,
                limit = self.limit,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient store failure; retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
