use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum spacing between request starts for one adapter instance.
///
/// The timestamp lock is held across the wait, so callers sharing an
/// instance queue up behind each other instead of reading a stale value.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 等到距離上一次請求至少 `min_interval` 才返回，回傳實際等待時間
    pub async fn enforce(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                tracing::debug!("Rate limit: waiting {}ms", waited.as_millis());
                sleep(waited).await;
            }
        }

        // 等待結束後才更新時間戳
        *last = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        assert_eq!(limiter.enforce().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        let mut starts = Vec::new();

        for _ in 0..5 {
            limiter.enforce().await;
            starts.push(Instant::now());
        }

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_wait_after_idle_time() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        limiter.enforce().await;

        sleep(Duration::from_millis(400)).await;
        let waited = limiter.enforce().await;

        assert!(waited <= Duration::from_millis(600));
        assert!(waited >= Duration::from_millis(590));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_do_not_under_wait() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(500)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.enforce().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }
}
