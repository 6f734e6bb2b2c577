//! Metrics-based observability hooks for provider attempts and chat turns.
//!
//! ```rust
//! use dobserve::MetricsObservabilityHooks;
//! use dprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use dchat::{ChatHooks, FailureClass, SessionId, TurnPhase};
use dprovider::{ProviderError, ProviderId, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "duochat_provider_attempt_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "duochat_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "duochat_provider_retry_delay_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_credential_rotated(&self, provider: ProviderId, _masked_credential: &str) {
        metrics::counter!(
            "duochat_provider_credential_rotations_total",
            "provider" => provider.to_string()
        )
        .increment(1);
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        metrics::counter!(
            "duochat_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "duochat_provider_attempts_per_success",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "duochat_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "duochat_provider_attempts_per_failure",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl ChatHooks for MetricsObservabilityHooks {
    fn on_turn_start(&self, _session: &SessionId, provider: ProviderId, model: &str) {
        metrics::counter!(
            "duochat_chat_turn_start_total",
            "provider" => provider.to_string(),
            "model" => model.to_string()
        )
        .increment(1);
    }

    fn on_phase_change(&self, _session: &SessionId, _from: TurnPhase, to: TurnPhase) {
        metrics::counter!("duochat_chat_phase_enter_total", "phase" => to.as_str())
            .increment(1);
    }

    fn on_failover(
        &self,
        _session: &SessionId,
        from: ProviderId,
        to: ProviderId,
        class: FailureClass,
    ) {
        metrics::counter!(
            "duochat_chat_failover_total",
            "from" => from.to_string(),
            "to" => to.to_string(),
            "failure" => class.as_str()
        )
        .increment(1);
    }

    fn on_turn_complete(&self, _session: &SessionId, provider: ProviderId, turn_tokens: u32) {
        metrics::counter!(
            "duochat_chat_turn_complete_total",
            "provider" => provider.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "duochat_chat_turn_tokens",
            "provider" => provider.to_string()
        )
        .record(turn_tokens as f64);
    }

    fn on_turn_failed(
        &self,
        _session: &SessionId,
        provider: ProviderId,
        class: FailureClass,
        _message: &str,
    ) {
        metrics::counter!(
            "duochat_chat_turn_failed_total",
            "provider" => provider.to_string(),
            "failure" => class.as_str()
        )
        .increment(1);
    }

    fn on_history_evicted(&self, _session: &SessionId, evicted_turns: usize) {
        metrics::counter!("duochat_chat_history_evicted_turns_total").increment(evicted_turns as u64);
    }

    fn on_context_warning(&self, _session: &SessionId, estimated_tokens: u64, _threshold: u64) {
        metrics::counter!("duochat_chat_context_warning_total").increment(1);
        metrics::gauge!("duochat_chat_context_estimated_tokens").set(estimated_tokens as f64);
    }
}
