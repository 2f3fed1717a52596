use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct ProviderState {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Per-provider circuit breaker: after `threshold` consecutive non-2xx responses the circuit
/// opens for `reset_timeout`; calls during that window fail fast. One probe is allowed through
/// (half-open) once the timeout elapses, and either closes the circuit on success or reopens it.
pub struct CircuitBreaker {
    threshold: u32,
    reset_timeout: Duration,
    providers: Mutex<HashMap<String, ProviderState>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            threshold,
            reset_timeout,
            providers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if a call for `key` may proceed, flipping `Open` to `HalfOpen` once the
    /// reset timeout has elapsed.
    pub fn allow(&self, key: &str) -> bool {
        let mut providers = self.providers.lock().unwrap();
        let entry = providers.entry(key.to_string()).or_default();
        match entry.state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                let Some(opened_at) = entry.opened_at else {
                    return true;
                };
                if opened_at.elapsed() >= self.reset_timeout {
                    entry.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, key: &str) {
        let mut providers = self.providers.lock().unwrap();
        let entry = providers.entry(key.to_string()).or_default();
        entry.state = State::Closed;
        entry.consecutive_failures = 0;
        entry.opened_at = None;
    }

    pub fn record_failure(&self, key: &str) {
        let mut providers = self.providers.lock().unwrap();
        let entry = providers.entry(key.to_string()).or_default();
        entry.consecutive_failures += 1;
        if entry.state == State::HalfOpen || entry.consecutive_failures >= self.threshold {
            entry.state = State::Open;
            entry.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            breaker.record_failure("openai");
            assert!(breaker.allow("openai"));
        }
        breaker.record_failure("openai");
        assert!(!breaker.allow("openai"));
    }

    #[test]
    fn success_resets_the_breaker() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure("anthropic");
        breaker.record_success("anthropic");
        breaker.record_failure("anthropic");
        assert!(breaker.allow("anthropic"));
    }

    #[test]
    fn half_open_probe_reopens_on_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        breaker.record_failure("gemini");
        assert!(!breaker.allow("gemini"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.allow("gemini"));
        breaker.record_failure("gemini");
        assert!(!breaker.allow("gemini"));
    }
}
