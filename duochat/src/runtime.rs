//! Wiring from a validated configuration to a running chat session.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use dchat::{ChatError, ChatOrchestrator};
use dobserve::{
    CompositeHooks, MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks,
    TracingObservabilityHooks,
};
use dprovider::ProviderError;

use crate::config::{ChatConfig, ConfigError};
use crate::providers::{ProviderSet, build_provider_set};
use crate::session::ChatSessionHandle;

/// Anything that can stop the client before the first prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupError {
    Config(ConfigError),
    Provider(ProviderError),
    Chat(ChatError),
}

impl Display for StartupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Provider(err) => write!(f, "provider setup failed: {err}"),
            Self::Chat(err) => write!(f, "chat setup failed: {err}"),
        }
    }
}

impl Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ProviderError> for StartupError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

impl From<ChatError> for StartupError {
    fn from(value: ChatError) -> Self {
        Self::Chat(value)
    }
}

/// Tracing plus metrics, in that order.
pub fn observability_hooks() -> CompositeHooks {
    CompositeHooks::new()
        .with(TracingObservabilityHooks)
        .with(MetricsObservabilityHooks)
}

pub fn build_orchestrator(
    config: &ChatConfig,
    providers: ProviderSet,
) -> Result<ChatOrchestrator, ChatError> {
    let mut builder = ChatOrchestrator::builder(providers.primary)
        .system_instruction(config.system_instruction.clone())
        .options(config.generation_options())
        .max_history_turns(config.max_history_turns)
        .context_warning_tokens(config.context_warning_tokens)
        .provider_hooks(Arc::new(SafeProviderHooks::new(observability_hooks())))
        .chat_hooks(Arc::new(SafeChatHooks::new(observability_hooks())));

    if let Some(fallback) = providers.fallback {
        builder = builder.fallback(fallback);
    }

    builder.build()
}

pub fn build_session(config: &ChatConfig) -> Result<ChatSessionHandle, StartupError> {
    let providers = build_provider_set(config)?;
    let orchestrator = build_orchestrator(config, providers)?;

    tracing::info!(
        session = %orchestrator.session_id(),
        provider = %orchestrator.active_provider_id(),
        model = orchestrator.model(),
        fallback = orchestrator.has_fallback(),
        "chat session ready"
    );

    Ok(ChatSessionHandle::new(orchestrator))
}
