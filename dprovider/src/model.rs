//! Provider-agnostic turn, request, and response model types.
//!
//! ```rust
//! use dprovider::{ProviderErrorKind, Turn, TurnRequest};
//!
//! let ok = TurnRequest::new_validated(
//!     "gemini-2.5-flash",
//!     vec![Turn::user("hi"), Turn::model("hello")],
//!     "summarize this diff",
//! );
//! assert!(ok.is_ok());
//!
//! let err = TurnRequest::new_validated("", Vec::new(), "hi")
//!     .err()
//!     .expect("empty model should fail");
//! assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);
//! ```

use std::fmt::{Display, Formatter};

use dcommon::GenerationOptions;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    Zhipu,
    DeepSeek,
    OpenAi,
}

impl ProviderId {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "zhipu" | "glm" | "bigmodel" => Some(Self::Zhipu),
            "deepseek" => Some(Self::DeepSeek),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// Human-facing service label used in notices.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::Zhipu => "Zhipu GLM",
            Self::DeepSeek => "DeepSeek",
            Self::OpenAi => "OpenAI",
        }
    }

    pub fn default_model(self) -> &'static str {
        self.model_catalog()[0]
    }

    pub fn model_catalog(self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &[
                "gemini-2.5-flash",
                "gemini-flash-latest",
                "gemini-2.5-flash-lite",
            ],
            Self::Zhipu => &["glm-4.6v", "glm-4.6", "glm-4.5-air", "glm-4.7"],
            Self::DeepSeek => &["deepseek-chat", "deepseek-reasoner"],
            Self::OpenAi => &["gpt-4o-mini", "gpt-4o"],
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::Gemini => "gemini",
            Self::Zhipu => "zhipu",
            Self::DeepSeek => "deepseek",
            Self::OpenAi => "openai",
        };

        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Model => f.write_str("model"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
        }
    }

    /// True when the backend did not report any counts.
    pub fn is_unreported(&self) -> bool {
        self.input_tokens == 0 && self.output_tokens == 0 && self.total_tokens == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub provider: ProviderId,
    pub model: String,
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

/// One provider call: prior history plus the new user text.
///
/// `history` never contains the turn being sent; the system instruction is
/// injected per request and is not part of the history.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<Turn>,
    pub user_text: String,
    pub options: GenerationOptions,
}

impl TurnRequest {
    pub fn new(model: impl Into<String>, history: Vec<Turn>, user_text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            history,
            user_text: user_text.into(),
            options: GenerationOptions::default(),
        }
    }

    pub fn new_validated(
        model: impl Into<String>,
        history: Vec<Turn>,
        user_text: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let request = Self::new(model, history, user_text);
        request.validate()?;
        Ok(request)
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        self.system_instruction = if instruction.trim().is_empty() {
            None
        } else {
            Some(instruction)
        };
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::invalid_request("model must not be empty"));
        }

        if self.user_text.trim().is_empty() {
            return Err(ProviderError::invalid_request("user text must not be empty"));
        }

        let alternates = self
            .history
            .iter()
            .enumerate()
            .all(|(index, turn)| match index % 2 {
                0 => turn.role == Role::User,
                _ => turn.role == Role::Model,
            });
        if !alternates || self.history.len() % 2 != 0 {
            return Err(ProviderError::invalid_request(
                "history must be complete user/model pairs",
            ));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_parse_aliases_and_expose_catalogs() {
        assert_eq!(ProviderId::parse("GLM"), Some(ProviderId::Zhipu));
        assert_eq!(ProviderId::parse(" gemini "), Some(ProviderId::Gemini));
        assert_eq!(ProviderId::parse("claude"), None);
        assert_eq!(ProviderId::Gemini.default_model(), "gemini-2.5-flash");
        assert_eq!(ProviderId::Zhipu.default_model(), "glm-4.6v");
        assert_eq!(ProviderId::DeepSeek.to_string(), "deepseek");
    }

    #[test]
    fn validate_rejects_dangling_history_and_bad_temperature() {
        let dangling = TurnRequest::new("m", vec![Turn::user("orphan")], "next");
        assert!(dangling.validate().is_err());

        let swapped = TurnRequest::new("m", vec![Turn::model("a"), Turn::user("b")], "next");
        assert!(swapped.validate().is_err());

        let hot = TurnRequest::new("m", Vec::new(), "hi")
            .with_options(GenerationOptions::default().with_temperature(3.0));
        assert!(hot.validate().is_err());
    }

    #[test]
    fn blank_system_instruction_is_dropped() {
        let request = TurnRequest::new("m", Vec::new(), "hi").with_system_instruction("  ");
        assert_eq!(request.system_instruction, None);
    }

    #[test]
    fn token_usage_totals_and_unreported_flag() {
        let usage = TokenUsage::new(3, 4);
        assert_eq!(usage.total_tokens, 7);
        assert!(!usage.is_unreported());
        assert!(TokenUsage::default().is_unreported());
    }
}
