use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use dchat::{ChatHooks, FailureClass, SessionId, TurnPhase};
use dprovider::{ProviderError, ProviderId, ProviderOperationHooks};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(provider, operation, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(provider, operation, attempt, delay, error)
        }));
    }

    fn on_credential_rotated(&self, provider: ProviderId, masked_credential: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_credential_rotated(provider, masked_credential)
        }));
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, attempts)
        }));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, attempts, error)
        }));
    }
}

/// Keeps a misbehaving observer from tearing down the turn it observes.
pub struct SafeChatHooks<H> {
    inner: H,
}

impl<H> SafeChatHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ChatHooks for SafeChatHooks<H>
where
    H: ChatHooks,
{
    fn on_turn_start(&self, session: &SessionId, provider: ProviderId, model: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(session, provider, model)
        }));
    }

    fn on_phase_change(&self, session: &SessionId, from: TurnPhase, to: TurnPhase) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_phase_change(session, from, to)
        }));
    }

    fn on_failover(
        &self,
        session: &SessionId,
        from: ProviderId,
        to: ProviderId,
        class: FailureClass,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failover(session, from, to, class)
        }));
    }

    fn on_turn_complete(&self, session: &SessionId, provider: ProviderId, turn_tokens: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_complete(session, provider, turn_tokens)
        }));
    }

    fn on_turn_failed(
        &self,
        session: &SessionId,
        provider: ProviderId,
        class: FailureClass,
        message: &str,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failed(session, provider, class, message)
        }));
    }

    fn on_history_evicted(&self, session: &SessionId, evicted_turns: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_history_evicted(session, evicted_turns)
        }));
    }

    fn on_context_warning(&self, session: &SessionId, estimated_tokens: u64, threshold: u64) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_context_warning(session, estimated_tokens, threshold)
        }));
    }
}
