//! Fan-out of provider and chat callbacks to several observers.
//!
//! ```rust
//! use dobserve::{CompositeHooks, MetricsObservabilityHooks, TracingObservabilityHooks};
//!
//! let hooks = CompositeHooks::new()
//!     .with(TracingObservabilityHooks)
//!     .with(MetricsObservabilityHooks);
//! assert_eq!(hooks.len(), 2);
//! ```

use std::sync::Arc;
use std::time::Duration;

use dchat::{ChatHooks, FailureClass, SessionId, TurnPhase};
use dprovider::{ProviderError, ProviderId, ProviderOperationHooks};

/// Fans provider and chat callbacks out to several observers in order.
#[derive(Default)]
pub struct CompositeHooks {
    provider: Vec<Arc<dyn ProviderOperationHooks>>,
    chat: Vec<Arc<dyn ChatHooks>>,
}

impl CompositeHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<H>(mut self, hooks: H) -> Self
    where
        H: ProviderOperationHooks + ChatHooks + 'static,
    {
        let hooks = Arc::new(hooks);
        self.provider.push(hooks.clone());
        self.chat.push(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.chat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chat.is_empty()
    }
}

impl ProviderOperationHooks for CompositeHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        for hooks in &self.provider {
            hooks.on_attempt_start(provider, operation, attempt);
        }
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        for hooks in &self.provider {
            hooks.on_retry_scheduled(provider, operation, attempt, delay, error);
        }
    }

    fn on_credential_rotated(&self, provider: ProviderId, masked_credential: &str) {
        for hooks in &self.provider {
            hooks.on_credential_rotated(provider, masked_credential);
        }
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        for hooks in &self.provider {
            hooks.on_success(provider, operation, attempts);
        }
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        for hooks in &self.provider {
            hooks.on_failure(provider, operation, attempts, error);
        }
    }
}

impl ChatHooks for CompositeHooks {
    fn on_turn_start(&self, session: &SessionId, provider: ProviderId, model: &str) {
        for hooks in &self.chat {
            hooks.on_turn_start(session, provider, model);
        }
    }

    fn on_phase_change(&self, session: &SessionId, from: TurnPhase, to: TurnPhase) {
        for hooks in &self.chat {
            hooks.on_phase_change(session, from, to);
        }
    }

    fn on_failover(
        &self,
        session: &SessionId,
        from: ProviderId,
        to: ProviderId,
        class: FailureClass,
    ) {
        for hooks in &self.chat {
            hooks.on_failover(session, from, to, class);
        }
    }

    fn on_turn_complete(&self, session: &SessionId, provider: ProviderId, turn_tokens: u32) {
        for hooks in &self.chat {
            hooks.on_turn_complete(session, provider, turn_tokens);
        }
    }

    fn on_turn_failed(
        &self,
        session: &SessionId,
        provider: ProviderId,
        class: FailureClass,
        message: &str,
    ) {
        for hooks in &self.chat {
            hooks.on_turn_failed(session, provider, class, message);
        }
    }

    fn on_history_evicted(&self, session: &SessionId, evicted_turns: usize) {
        for hooks in &self.chat {
            hooks.on_history_evicted(session, evicted_turns);
        }
    }

    fn on_context_warning(&self, session: &SessionId, estimated_tokens: u64, threshold: u64) {
        for hooks in &self.chat {
            hooks.on_context_warning(session, estimated_tokens, threshold);
        }
    }
}
