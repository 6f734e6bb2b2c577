//! Chat-layer errors and provider failure classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use dprovider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Provider,
    History,
    Configuration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn history(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::History, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Configuration, message)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        ChatError::provider(value.to_string())
    }
}

/// How the orchestrator treats a failed provider attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Rotate credentials, back off, retry.
    RateLimited,
    /// No retry; eligible for failover.
    Unavailable,
    /// No retry; eligible for failover.
    InvalidRequest,
    /// Surfaced immediately.
    Unknown,
}

impl FailureClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::InvalidRequest => "invalid_request",
            Self::Unknown => "unknown",
        }
    }

    pub fn allows_failover(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Short human-readable summary used as the prefix of error events.
    pub fn summary(self) -> &'static str {
        match self {
            Self::RateLimited => "Rate limit reached and retries exhausted",
            Self::Unavailable => "Service temporarily unavailable",
            Self::InvalidRequest => "Request was rejected",
            Self::Unknown => "Unexpected error",
        }
    }
}

impl Display for FailureClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw provider error onto the orchestrator's failure taxonomy.
///
/// Typed kinds decide directly. Untyped errors fall back to scanning the
/// message for status codes and status names, since some backends only
/// report them inline in the stream body.
///
/// ```rust
/// use dchat::{FailureClass, classify};
/// use dprovider::ProviderError;
///
/// assert_eq!(classify(&ProviderError::rate_limited("slow down")), FailureClass::RateLimited);
/// assert_eq!(classify(&ProviderError::other("code 503 UNAVAILABLE")), FailureClass::Unavailable);
/// assert_eq!(classify(&ProviderError::other("segfault")), FailureClass::Unknown);
/// ```
pub fn classify(error: &ProviderError) -> FailureClass {
    match error.kind {
        ProviderErrorKind::RateLimited => FailureClass::RateLimited,
        ProviderErrorKind::Unavailable
        | ProviderErrorKind::Timeout
        | ProviderErrorKind::Transport => FailureClass::Unavailable,
        ProviderErrorKind::InvalidRequest | ProviderErrorKind::Authentication => {
            FailureClass::InvalidRequest
        }
        ProviderErrorKind::PoolEmpty => FailureClass::Unknown,
        ProviderErrorKind::Other => classify_message(&error.message),
    }
}

fn classify_message(message: &str) -> FailureClass {
    let upper = message.to_ascii_uppercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| upper.contains(needle));

    if mentions(&["429", "RESOURCE_EXHAUSTED", "RATE LIMIT"]) {
        FailureClass::RateLimited
    } else if mentions(&["503", "UNAVAILABLE", "OVERLOADED", "TIMEOUT", "CONNECTION"]) {
        FailureClass::Unavailable
    } else if mentions(&["400", "INVALID"]) {
        FailureClass::InvalidRequest
    } else {
        FailureClass::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_kinds_classify_without_message_inspection() {
        assert_eq!(
            classify(&ProviderError::timeout("429 in text is ignored")),
            FailureClass::Unavailable
        );
        assert_eq!(
            classify(&ProviderError::authentication("bad key")),
            FailureClass::InvalidRequest
        );
        assert_eq!(
            classify(&ProviderError::pool_empty("no keys")),
            FailureClass::Unknown
        );
    }

    #[test]
    fn untyped_errors_are_classified_by_message() {
        assert_eq!(
            classify(&ProviderError::other("429 Too Many Requests")),
            FailureClass::RateLimited
        );
        assert_eq!(
            classify(&ProviderError::other("connection reset by peer")),
            FailureClass::Unavailable
        );
        assert_eq!(
            classify(&ProviderError::other("400 invalid_argument")),
            FailureClass::InvalidRequest
        );
    }

    #[test]
    fn only_unknown_blocks_failover() {
        assert!(FailureClass::RateLimited.allows_failover());
        assert!(FailureClass::InvalidRequest.allows_failover());
        assert!(!FailureClass::Unknown.allows_failover());
    }
}
