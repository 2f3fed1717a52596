use std::time::Duration;

/// Mirrors the proxy's configurable `proxy.retry.*` settings (see the settings catalog).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_on: Vec<u16>,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_on: vec![429, 500, 502, 503, 504],
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, status: u16) -> bool {
        self.retry_on.contains(&status)
    }

    /// Exponential backoff from `retry_delay`, capped at 64x, with up to `retry_delay` of jitter.
    pub fn backoff_delay(&self, attempt_no: u32) -> Duration {
        let step = attempt_no.saturating_sub(1).min(6);
        let base_ms = self.retry_delay.as_millis() as u64;
        let backoff = base_ms.saturating_mul(1u64 << step);
        let jitter = rand::random::<u64>() % (base_ms + 1);
        Duration::from_millis(backoff + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retries_only_configured_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(429));
        assert!(policy.should_retry(503));
        assert!(!policy.should_retry(404));
    }

    #[test]
    fn backoff_grows_with_attempt_number() {
        let policy = RetryPolicy::default();
        let first = policy.backoff_delay(1).as_millis();
        let third = policy.backoff_delay(3).as_millis();
        assert!(third >= first);
    }
}
