//! Common imports for most duochat applications.

pub use crate::{
    ActiveProvider, ChatConfig, ChatError, ChatEvent, ChatEventStream, ChatHooks,
    ChatOrchestrator, ChatSessionHandle, FailureClass, GenerationOptions, ProviderClient,
    ProviderError, ProviderId, ProviderSlot, Role, SessionId, StartupError, Turn, TurnPhase,
    build_orchestrator, build_provider_set, build_session,
};
pub use crate::{turn, turns};
