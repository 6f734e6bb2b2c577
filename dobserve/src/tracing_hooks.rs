//! Tracing-based observability hooks for provider attempts and chat turns.
//!
//! ```rust
//! use dchat::ChatHooks;
//! use dobserve::TracingObservabilityHooks;
//!
//! fn accepts_chat_hooks(_hooks: &dyn ChatHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_chat_hooks(&hooks);
//! ```

use std::time::Duration;

use dchat::{ChatHooks, FailureClass, SessionId, TurnPhase};
use dprovider::{ProviderError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        tracing::info!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_credential_rotated(&self, provider: ProviderId, masked_credential: &str) {
        tracing::info!(
            phase = "provider",
            event = "credential_rotated",
            provider = %provider,
            credential = masked_credential
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        tracing::info!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            attempts
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ChatHooks for TracingObservabilityHooks {
    fn on_turn_start(&self, session: &SessionId, provider: ProviderId, model: &str) {
        tracing::info!(
            phase = "chat",
            event = "turn_start",
            session_id = %session,
            provider = %provider,
            model
        );
    }

    fn on_phase_change(&self, session: &SessionId, from: TurnPhase, to: TurnPhase) {
        tracing::debug!(
            phase = "chat",
            event = "phase_change",
            session_id = %session,
            from = %from,
            to = %to
        );
    }

    fn on_failover(
        &self,
        session: &SessionId,
        from: ProviderId,
        to: ProviderId,
        class: FailureClass,
    ) {
        tracing::warn!(
            phase = "chat",
            event = "failover",
            session_id = %session,
            from = %from,
            to = %to,
            failure = %class
        );
    }

    fn on_turn_complete(&self, session: &SessionId, provider: ProviderId, turn_tokens: u32) {
        tracing::info!(
            phase = "chat",
            event = "turn_complete",
            session_id = %session,
            provider = %provider,
            turn_tokens
        );
    }

    fn on_turn_failed(
        &self,
        session: &SessionId,
        provider: ProviderId,
        class: FailureClass,
        message: &str,
    ) {
        tracing::error!(
            phase = "chat",
            event = "turn_failed",
            session_id = %session,
            provider = %provider,
            failure = %class,
            message
        );
    }

    fn on_history_evicted(&self, session: &SessionId, evicted_turns: usize) {
        tracing::debug!(
            phase = "chat",
            event = "history_evicted",
            session_id = %session,
            evicted_turns
        );
    }

    fn on_context_warning(&self, session: &SessionId, estimated_tokens: u64, threshold: u64) {
        tracing::warn!(
            phase = "chat",
            event = "context_warning",
            session_id = %session,
            estimated_tokens,
            threshold
        );
    }
}
