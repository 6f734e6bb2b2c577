//! Observer contract for chat-turn lifecycle events.

use dcommon::SessionId;
use dprovider::ProviderId;

use crate::{FailureClass, TurnPhase};

/// All methods default to no-ops. Implementations must be cheap; they run
/// inline on the turn's task.
pub trait ChatHooks: Send + Sync {
    fn on_turn_start(&self, _session: &SessionId, _provider: ProviderId, _model: &str) {}

    fn on_phase_change(&self, _session: &SessionId, _from: TurnPhase, _to: TurnPhase) {}

    fn on_failover(
        &self,
        _session: &SessionId,
        _from: ProviderId,
        _to: ProviderId,
        _class: FailureClass,
    ) {
    }

    fn on_turn_complete(&self, _session: &SessionId, _provider: ProviderId, _turn_tokens: u32) {}

    fn on_turn_failed(
        &self,
        _session: &SessionId,
        _provider: ProviderId,
        _class: FailureClass,
        _message: &str,
    ) {
    }

    fn on_history_evicted(&self, _session: &SessionId, _evicted_turns: usize) {}

    fn on_context_warning(&self, _session: &SessionId, _estimated_tokens: u64, _threshold: u64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatHooks;

impl ChatHooks for NoopChatHooks {}
