//! Gemini adapter types and provider-agnostic conversion logic.

use crate::{ModelResponse, ProviderId, Role, StopReason, TokenUsage, Turn};

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiRequest {
    pub model: String,
    pub contents: Vec<GeminiContent>,
    pub system_instruction: Option<String>,
    pub google_search: bool,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiContent {
    pub role: GeminiRole,
    pub text: String,
}

impl From<Turn> for GeminiContent {
    fn from(value: Turn) -> Self {
        Self {
            role: value.role.into(),
            text: value.text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiRole {
    User,
    Model,
}

impl GeminiRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl From<Role> for GeminiRole {
    fn from(value: Role) -> Self {
        match value {
            Role::User => Self::User,
            Role::Model => Self::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiFinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other,
}

impl From<GeminiFinishReason> for StopReason {
    fn from(value: GeminiFinishReason) -> Self {
        match value {
            GeminiFinishReason::Stop => Self::EndTurn,
            GeminiFinishReason::MaxTokens => Self::MaxTokens,
            GeminiFinishReason::Safety => Self::Safety,
            GeminiFinishReason::Other => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeminiUsage {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

impl From<GeminiUsage> for TokenUsage {
    fn from(value: GeminiUsage) -> Self {
        let total = if value.total_token_count == 0 {
            value
                .prompt_token_count
                .saturating_add(value.candidates_token_count)
        } else {
            value.total_token_count
        };

        Self {
            input_tokens: value.prompt_token_count,
            output_tokens: value.candidates_token_count,
            total_tokens: total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiCompletion {
    pub model: String,
    pub text: String,
    pub finish_reason: GeminiFinishReason,
    pub usage: GeminiUsage,
}

impl GeminiCompletion {
    pub(crate) fn into_model_response(self) -> ModelResponse {
        ModelResponse {
            provider: ProviderId::Gemini,
            model: self.model,
            text: self.text,
            stop_reason: self.finish_reason.into(),
            usage: self.usage.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiStreamChunk {
    TextDelta(String),
    Completed(GeminiCompletion),
}
