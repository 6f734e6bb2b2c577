//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use dprovider::{ProviderError, ProviderErrorKind};
//!
//! let limited = ProviderError::from_status(429, "quota exceeded");
//! assert_eq!(limited.kind, ProviderErrorKind::RateLimited);
//! assert!(limited.retryable);
//!
//! let bad = ProviderError::from_status(400, "malformed history");
//! assert_eq!(bad.kind, ProviderErrorKind::InvalidRequest);
//! assert!(!bad.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    PoolEmpty,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn pool_empty(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::PoolEmpty, message, false)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Maps an HTTP status code returned by a backend onto an error kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::authentication(message),
            429 => Self::rate_limited(message),
            408 | 504 => Self::timeout(message),
            500..=599 => Self::unavailable(message),
            400..=499 => Self::invalid_request(message),
            _ => Self::transport(message),
        }
    }

    /// Maps a backend status string such as `RESOURCE_EXHAUSTED` onto an error kind.
    pub fn from_status_name(status: &str, message: impl Into<String>) -> Self {
        match status {
            "RESOURCE_EXHAUSTED" => Self::rate_limited(message),
            "UNAVAILABLE" | "INTERNAL" => Self::unavailable(message),
            "DEADLINE_EXCEEDED" => Self::timeout(message),
            "UNAUTHENTICATED" | "PERMISSION_DENIED" => Self::authentication(message),
            "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "NOT_FOUND" => {
                Self::invalid_request(message)
            }
            _ => Self::other(message),
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}
