//! OpenAI-compatible HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};

use crate::ProviderError;

use super::types::{OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiUsage};

pub(crate) fn build_api_request(request: OpenAiRequest) -> Result<OpenAiApiRequest, ProviderError> {
    if request.messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "chat completion request requires at least one message",
        ));
    }

    let messages = request
        .messages
        .into_iter()
        .map(OpenAiApiMessage::from)
        .collect::<Vec<_>>();

    let tools = request.web_search.then(|| {
        vec![OpenAiApiTool {
            r#type: "web_search",
            web_search: OpenAiApiWebSearch {
                enable: true,
                search_result: true,
            },
        }]
    });

    let stream_options = request
        .include_usage
        .then_some(OpenAiApiStreamOptions { include_usage: true });

    Ok(OpenAiApiRequest {
        model: request.model,
        messages,
        tools,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: true,
        stream_options,
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> OpenAiFinishReason {
    match value {
        Some("stop") => OpenAiFinishReason::Stop,
        Some("length") => OpenAiFinishReason::Length,
        Some("content_filter") | Some("sensitive") => OpenAiFinishReason::ContentFilter,
        _ => OpenAiFinishReason::Other,
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<OpenAiApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiErrorEnvelope {
    pub error: OpenAiApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiError {
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl OpenAiApiError {
    /// Classifies an error object that arrived inside an otherwise successful stream.
    ///
    /// Zhipu reports numeric business codes (`1302`, `1305`, ...) as strings or
    /// numbers; OpenAI and DeepSeek report a textual `code` or `type`.
    pub(crate) fn into_provider_error(self) -> ProviderError {
        let code = match &self.code {
            Some(serde_json::Value::String(code)) => Some(code.clone()),
            Some(serde_json::Value::Number(code)) => Some(code.to_string()),
            _ => None,
        };
        let label = code.as_deref().or(self.kind.as_deref());
        let message = match label {
            Some(label) => format!("{label} {}", self.message),
            None => self.message,
        };

        if let Some(numeric) = code.as_deref().and_then(|code| code.parse::<u16>().ok()) {
            return from_numeric_code(numeric, message);
        }

        let name = code.as_deref().or(self.kind.as_deref()).unwrap_or_default();
        match name {
            "rate_limit_exceeded" | "insufficient_quota" | "rate_limit_error" => {
                ProviderError::rate_limited(message)
            }
            "server_error" | "service_unavailable" | "overloaded_error" => {
                ProviderError::unavailable(message)
            }
            "invalid_request_error" | "context_length_exceeded" => {
                ProviderError::invalid_request(message)
            }
            "invalid_api_key" | "authentication_error" => ProviderError::authentication(message),
            other => ProviderError::from_status_name(&other.to_ascii_uppercase(), message),
        }
    }
}

fn from_numeric_code(code: u16, message: String) -> ProviderError {
    match code {
        100..=599 => ProviderError::from_status(code, message),
        1000..=1004 => ProviderError::authentication(message),
        1302..=1305 => ProviderError::rate_limited(message),
        1234 => ProviderError::unavailable(message),
        1210..=1214 | 1261 | 1301 => ProviderError::invalid_request(message),
        _ => ProviderError::other(message),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<OpenAiApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<OpenAiApiStreamOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<OpenAiMessage> for OpenAiApiMessage {
    fn from(value: OpenAiMessage) -> Self {
        Self {
            role: value.role.as_str(),
            content: value.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiTool {
    pub r#type: &'static str,
    pub web_search: OpenAiApiWebSearch,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiWebSearch {
    pub enable: bool,
    pub search_result: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiStreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiApiStreamChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiApiUsage>,
    #[serde(default)]
    pub error: Option<OpenAiApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    #[serde(default)]
    pub delta: OpenAiApiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiStreamDelta {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<OpenAiApiUsage> for OpenAiUsage {
    fn from(value: OpenAiApiUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}
