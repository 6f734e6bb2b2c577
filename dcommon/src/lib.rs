//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use dcommon::{GenerationOptions, SessionId, estimate_tokens};
//!
//! let session = SessionId::from("session-1");
//! let options = GenerationOptions::default().with_temperature(0.3).enable_web_search();
//!
//! assert_eq!(session.as_str(), "session-1");
//! assert!(options.web_search);
//! assert_eq!(estimate_tokens("hello world"), 7);
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use dcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Session identifier newtype shared by the chat layer and its hooks.
    //!
    //! ```rust
    //! use dcommon::SessionId;
    //!
    //! let session = SessionId::new("session-42");
    //! assert_eq!(session.to_string(), "session-42");
    //! ```

    use std::fmt::{Display, Formatter};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct SessionId(String);

    impl SessionId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Default for SessionId {
        fn default() -> Self {
            Self::new("default")
        }
    }

    impl Display for SessionId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for SessionId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for SessionId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod model {
    //! Per-request generation settings injected into every provider call.
    //!
    //! ```rust
    //! use dcommon::GenerationOptions;
    //!
    //! let options = GenerationOptions::default()
    //!     .with_temperature(0.2)
    //!     .with_max_tokens(128);
    //!
    //! assert_eq!(options.temperature, Some(0.2));
    //! assert_eq!(options.max_tokens, Some(128));
    //! assert!(!options.web_search);
    //! ```

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GenerationOptions {
        pub temperature: Option<f32>,
        pub max_tokens: Option<u32>,
        pub web_search: bool,
    }

    impl GenerationOptions {
        pub fn with_temperature(mut self, temperature: f32) -> Self {
            self.temperature = Some(temperature);
            self
        }

        pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
            self.max_tokens = Some(max_tokens);
            self
        }

        pub fn with_web_search(mut self, web_search: bool) -> Self {
            self.web_search = web_search;
            self
        }

        pub fn enable_web_search(self) -> Self {
            self.with_web_search(true)
        }
    }
}

pub mod text {
    //! Character-based token estimates and display truncation.
    //!
    //! Providers do not always report usage, so the chat layer falls back to
    //! a flat 0.7 tokens per character, which is close enough for mixed
    //! CJK/Latin text.
    //!
    //! ```rust
    //! use dcommon::{estimate_tokens, truncate_chars};
    //!
    //! assert_eq!(estimate_tokens(""), 1);
    //! assert_eq!(truncate_chars("abcdef", 3), "abc...");
    //! ```

    pub const TOKENS_PER_CHAR: f64 = 0.7;

    /// Estimated token count for `text`, never less than one.
    pub fn estimate_tokens(text: &str) -> u32 {
        estimate_tokens_for_chars(text.chars().count())
    }

    pub fn estimate_tokens_for_chars(chars: usize) -> u32 {
        let estimate = (chars as f64 * TOKENS_PER_CHAR) as u64;
        estimate.clamp(1, u32::MAX as u64) as u32
    }

    /// Truncates on a character boundary, appending `...` when shortened.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((index, _)) => format!("{}...", &text[..index]),
            None => text.to_string(),
        }
    }
}

pub use context::SessionId;
pub use future::BoxFuture;
pub use model::GenerationOptions;
pub use text::{estimate_tokens, estimate_tokens_for_chars, truncate_chars};

#[cfg(test)]
mod tests {
    use super::{GenerationOptions, SessionId, estimate_tokens, truncate_chars};

    #[test]
    fn session_id_round_trips_strings() {
        let session = SessionId::new("session-1");

        assert_eq!(session.as_str(), "session-1");
        assert_eq!(session.to_string(), "session-1");
        assert_eq!(SessionId::from("session-1".to_string()), session);
    }

    #[test]
    fn generation_options_builder_helpers_set_values() {
        let options = GenerationOptions::default()
            .with_temperature(0.3)
            .with_max_tokens(123)
            .enable_web_search();

        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.max_tokens, Some(123));
        assert!(options.web_search);
    }

    #[test]
    fn token_estimate_counts_characters_not_bytes() {
        assert_eq!(estimate_tokens("你好世界你好世界你好"), 7);
        assert_eq!(estimate_tokens("hello world"), 7);
        assert_eq!(estimate_tokens("a"), 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 0), "");
    }
}
