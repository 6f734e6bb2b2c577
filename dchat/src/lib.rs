//! Conversational orchestration over model providers.
//!
//! [`ChatOrchestrator`] owns one conversation. Each call to
//! [`ChatOrchestrator::send_turn`] streams [`ChatEvent`]s while it retries
//! rate-limited attempts with credential rotation, fails over to a secondary
//! provider when the primary is unavailable, and keeps the transcript made
//! of whole User/Model pairs.

mod error;
mod history;
mod hooks;
mod orchestrator;
mod types;

pub mod prelude {
    pub use crate::{
        ActiveProvider, ChatError, ChatErrorKind, ChatEvent, ChatEventStream, ChatHooks,
        ChatOrchestrator, ChatOrchestratorBuilder, ConversationState, FailureClass,
        NoopChatHooks, ProviderSlot, Sleeper, TimerSleeper, TurnPhase, classify,
    };
    pub use dcommon::{GenerationOptions, SessionId};
}

pub use error::{ChatError, ChatErrorKind, FailureClass, classify};
pub use history::{ConversationState, DEFAULT_MAX_HISTORY_TURNS, PendingTurn};
pub use hooks::{ChatHooks, NoopChatHooks};
pub use orchestrator::{
    ChatOrchestrator, ChatOrchestratorBuilder, DEFAULT_CONTEXT_WARNING_TOKENS, ProviderSlot,
    Sleeper, TimerSleeper,
};
pub use types::{ActiveProvider, ChatEvent, ChatEventStream, TurnPhase};
pub use dcommon::{GenerationOptions, SessionId};
