//! Two-backend terminal chat client built on the duochat workspace crates.
//!
//! This crate is the single dependency for applications. It re-exports the
//! provider, chat, and observability crates, loads configuration, builds
//! providers from it, and runs turns off the caller's task.
//!
//! ```rust
//! use duochat::{ActiveProvider, ProviderId, turns};
//!
//! let transcript = turns![user => "hi", model => "hello"];
//! assert_eq!(transcript.len(), 2);
//! assert_eq!(ActiveProvider::Primary.toggled(), ActiveProvider::Fallback);
//! assert_eq!(ProviderId::parse("glm"), Some(ProviderId::Zhipu));
//! ```

mod macros;

pub mod commands;
pub mod config;
pub mod prelude;
pub mod providers;
pub mod runtime;
pub mod session;

pub use dchat;
pub use dcommon;
pub use dobserve;
pub use dprovider;

pub use dchat::{
    ActiveProvider, ChatError, ChatErrorKind, ChatEvent, ChatEventStream, ChatHooks,
    ChatOrchestrator, ChatOrchestratorBuilder, ConversationState, FailureClass, NoopChatHooks,
    ProviderSlot, Sleeper, TimerSleeper, TurnPhase, classify,
};
pub use dcommon::{BoxFuture, GenerationOptions, SessionId, estimate_tokens, truncate_chars};
pub use dobserve::{
    CompositeHooks, MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks,
    TracingObservabilityHooks,
};
pub use dprovider::{
    BoxedEventStream, CredentialPool, LazyProviderClient, ModelResponse, NoopOperationHooks,
    ProviderClient, ProviderError, ProviderErrorKind, ProviderFuture, ProviderId,
    ProviderOperationHooks, RateLimits, RateMonitor, RateStats, RetryPolicy, Role, StopReason,
    StreamEvent, TokenUsage, Turn, TurnRequest, parse_key_list,
};

pub use config::{ChatConfig, ConfigError, ConfigErrorKind, ProviderSettings};
pub use providers::{ProviderSet, build_provider_set};
pub use runtime::{StartupError, build_orchestrator, build_session, observability_hooks};
pub use session::ChatSessionHandle;

#[cfg(test)]
mod tests {
    use crate::Role;

    #[test]
    fn turn_macro_creates_expected_turn() {
        let turn = crate::turn!(user => "hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.text, "hello");
    }

    #[test]
    fn turns_macro_builds_alternating_transcript() {
        let turns = crate::turns![
            user => "Summarize the repo",
            model => "It is a chat client.",
            user => "Shorter",
            model => "Chat client.",
        ];

        assert_eq!(turns.len(), 4);
        assert!(
            turns
                .iter()
                .enumerate()
                .all(|(index, turn)| turn.role == if index % 2 == 0 { Role::User } else { Role::Model })
        );
    }

    #[test]
    fn empty_turns_macro_is_empty() {
        let turns = crate::turns![];
        assert!(turns.is_empty());
    }
}
