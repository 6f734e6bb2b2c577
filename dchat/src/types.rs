//! Chat events, provider selection, and turn phase types.

use std::fmt::{Display, Formatter};
use std::pin::Pin;

use futures_core::Stream;

use crate::FailureClass;

/// Everything a caller can observe while a turn runs.
///
/// A turn ends with exactly one of `TokenStats` (success) or `Error`
/// (failure), except for blank input, which yields nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    TextFragment(String),
    /// A retry is about to happen; `attempt` counts retries from 1.
    ReconnectAttempt { attempt: u32, max_attempts: u32 },
    TokenStats { turn_tokens: u32 },
    SystemNotice(String),
    Error { kind: FailureClass, message: String },
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TokenStats { .. } | Self::Error { .. })
    }
}

pub type ChatEventStream<'a> = Pin<Box<dyn Stream<Item = ChatEvent> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActiveProvider {
    #[default]
    Primary,
    Fallback,
}

impl ActiveProvider {
    pub fn toggled(self) -> Self {
        match self {
            Self::Primary => Self::Fallback,
            Self::Fallback => Self::Primary,
        }
    }
}

impl Display for ActiveProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    RateLimited,
    Unavailable,
    Failed,
}

impl TurnPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sending => "sending",
            Self::Streaming => "streaming",
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::Failed => "failed",
        }
    }
}

impl Display for TurnPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
