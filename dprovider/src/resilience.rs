//! Retry/backoff policy and operational hook contracts.
//!
//! The chat layer owns the retry loop because a retry may also rotate the
//! credential pool. This module only supplies the timing rules and the
//! hook surface that observers implement.

use std::time::Duration;

use crate::{ProviderError, ProviderId};

/// Linear backoff with a cap.
///
/// Retry `n` (1-based) waits `base + step * (n - 1)`, capped at
/// `max_backoff`, where `base` depends on whether a credential rotation
/// happened just before the retry.
///
/// ```rust
/// use std::time::Duration;
/// use dprovider::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.backoff_for_retry(1, true), Duration::from_secs(1));
/// assert_eq!(policy.backoff_for_retry(1, false), Duration::from_secs(2));
/// assert_eq!(policy.backoff_for_retry(3, false), Duration::from_secs(6));
/// assert_eq!(policy.backoff_for_retry(9, false), Duration::from_secs(8));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub rotated_backoff: Duration,
    pub single_key_backoff: Duration,
    pub backoff_step: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rotated_backoff: Duration::from_secs(1),
            single_key_backoff: Duration::from_secs(2),
            backoff_step: Duration::from_secs(2),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Zero-delay policy, mostly useful in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            rotated_backoff: Duration::ZERO,
            single_key_backoff: Duration::ZERO,
            backoff_step: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Whether retry number `retry` (1-based) is still permitted.
    pub fn allows_retry(&self, retry: u32) -> bool {
        retry >= 1 && retry <= self.max_retries
    }

    pub fn backoff_for_retry(&self, retry: u32, rotated: bool) -> Duration {
        let base = if rotated {
            self.rotated_backoff
        } else {
            self.single_key_backoff
        };
        let steps = retry.saturating_sub(1);
        let grown = base.saturating_add(self.backoff_step.saturating_mul(steps));
        grown.min(self.max_backoff)
    }
}

/// Observer for provider-level attempts. All methods default to no-ops.
pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _provider: ProviderId, _operation: &str, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_credential_rotated(&self, _provider: ProviderId, _masked_credential: &str) {}

    fn on_success(&self, _provider: ProviderId, _operation: &str, _attempts: u32) {}

    fn on_failure(
        &self,
        _provider: ProviderId,
        _operation: &str,
        _attempts: u32,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn retry_budget_is_inclusive() {
        let policy = RetryPolicy::new(3);

        assert!(!policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(policy.allows_retry(3));
        assert!(!policy.allows_retry(4));
    }

    #[test]
    fn backoff_grows_linearly_and_caps() {
        let policy = RetryPolicy::default();

        let rotated = (1..=5)
            .map(|retry| policy.backoff_for_retry(retry, true).as_secs())
            .collect::<Vec<_>>();
        assert_eq!(rotated, vec![1, 3, 5, 7, 8]);

        let single = (1..=5)
            .map(|retry| policy.backoff_for_retry(retry, false).as_secs())
            .collect::<Vec<_>>();
        assert_eq!(single, vec![2, 4, 6, 8, 8]);
    }

    #[test]
    fn immediate_policy_never_waits() {
        let policy = RetryPolicy::immediate(2);
        assert_eq!(policy.backoff_for_retry(2, false), Duration::ZERO);
        assert!(policy.allows_retry(2));
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl ProviderOperationHooks for RecordingHooks {
        fn on_credential_rotated(&self, provider: ProviderId, masked_credential: &str) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("rotated:{provider}:{masked_credential}"));
        }
    }

    #[test]
    fn hooks_default_to_noops_and_can_be_overridden() {
        let hooks = RecordingHooks::default();
        hooks.on_attempt_start(ProviderId::Gemini, "stream_turn", 1);
        hooks.on_credential_rotated(ProviderId::Gemini, "AIza...1234");

        let events = hooks.events.lock().expect("events lock").clone();
        assert_eq!(events, vec!["rotated:gemini:AIza...1234".to_string()]);

        NoopOperationHooks.on_success(ProviderId::Zhipu, "stream_turn", 1);
    }
}
