/// Outcome of an upstream call made with a pooled account's token, as observed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    RateLimited,
    Unauthorized,
    Forbidden,
    DecryptFailure,
    OtherFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthState {
    pub status: String,
    pub is_active: bool,
    pub consecutive_failures: i32,
    pub error_message: Option<String>,
}

impl HealthState {
    pub fn active() -> Self {
        Self {
            status: "active".to_string(),
            is_active: true,
            consecutive_failures: 0,
            error_message: None,
        }
    }

    /// Applies one [`CallOutcome`] to the current state per the account health state machine:
    /// `active ⇄ rate_limited` on 429/successful refresh; `→ expired` on 401 immediately;
    /// `→ forbidden` on 403 or decrypt failure; `→ error` on any other failure ≥ 3.
    pub fn apply(&self, outcome: CallOutcome, detail: Option<String>) -> HealthState {
        match outcome {
            CallOutcome::Success => HealthState::active(),
            CallOutcome::RateLimited => HealthState {
                status: "rate_limited".to_string(),
                is_active: true,
                consecutive_failures: self.consecutive_failures,
                error_message: detail,
            },
            CallOutcome::Forbidden | CallOutcome::DecryptFailure => HealthState {
                status: "forbidden".to_string(),
                is_active: false,
                consecutive_failures: self.consecutive_failures + 1,
                error_message: detail,
            },
            CallOutcome::Unauthorized => HealthState {
                status: "expired".to_string(),
                is_active: false,
                consecutive_failures: self.consecutive_failures + 1,
                error_message: detail,
            },
            CallOutcome::OtherFailure => {
                let failures = self.consecutive_failures + 1;
                if failures >= 3 {
                    HealthState {
                        status: "error".to_string(),
                        is_active: false,
                        consecutive_failures: failures,
                        error_message: detail,
                    }
                } else {
                    HealthState {
                        status: self.status.clone(),
                        is_active: self.is_active,
                        consecutive_failures: failures,
                        error_message: detail,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_single_unauthorized_failure_expires_the_account() {
        let state = HealthState::active().apply(CallOutcome::Unauthorized, Some("401".to_string()));
        assert_eq!(state.status, "expired");
        assert!(!state.is_active);
        assert_eq!(state.consecutive_failures, 1);
    }

    #[test]
    fn forbidden_deactivates_immediately() {
        let state = HealthState::active().apply(CallOutcome::Forbidden, Some("403".to_string()));
        assert_eq!(state.status, "forbidden");
        assert!(!state.is_active);
    }

    #[test]
    fn success_resets_failure_counter() {
        let state = HealthState::active()
            .apply(CallOutcome::Unauthorized, None)
            .apply(CallOutcome::Success, None);
        assert_eq!(state.status, "active");
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn rate_limited_stays_active_but_flags_status() {
        let state = HealthState::active().apply(CallOutcome::RateLimited, None);
        assert_eq!(state.status, "rate_limited");
        assert!(state.is_active);
    }
}
