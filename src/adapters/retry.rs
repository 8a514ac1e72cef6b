use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded retries with exponential backoff (`base_delay * 2^(attempt-1)`).
///
/// Every error is retried the same way; a 404 gets the same treatment as a
/// timeout. The error from the final attempt is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 第 `attempt` 次失敗後的等待時間（attempt 從 1 開始）
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation` until it succeeds or the attempts are used up. The
    /// closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.attempts => {
                    tracing::warn!(
                        "Request failed after {} attempts, giving up: {}",
                        self.attempts,
                        e
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        attempt,
                        self.attempts,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
