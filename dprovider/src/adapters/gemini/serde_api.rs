//! Gemini HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};

use crate::ProviderError;

use super::types::{GeminiContent, GeminiFinishReason, GeminiRequest, GeminiUsage};

pub(crate) fn build_api_request(request: GeminiRequest) -> Result<GeminiApiRequest, ProviderError> {
    if request.contents.is_empty() {
        return Err(ProviderError::invalid_request(
            "Gemini request requires at least one content entry",
        ));
    }

    let contents = request
        .contents
        .into_iter()
        .map(GeminiApiContent::from)
        .collect::<Vec<_>>();

    let system_instruction = request.system_instruction.map(|text| GeminiApiSystemInstruction {
        parts: vec![GeminiApiPart { text }],
    });

    let tools = request.google_search.then(|| {
        vec![GeminiApiTool {
            google_search: GeminiApiGoogleSearch {},
        }]
    });

    let generation_config = if request.temperature.is_some() || request.max_output_tokens.is_some() {
        Some(GeminiApiGenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
        })
    } else {
        None
    };

    Ok(GeminiApiRequest {
        contents,
        system_instruction,
        tools,
        generation_config,
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> GeminiFinishReason {
    match value {
        Some("STOP") => GeminiFinishReason::Stop,
        Some("MAX_TOKENS") => GeminiFinishReason::MaxTokens,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT")
        | Some("SPII") => GeminiFinishReason::Safety,
        _ => GeminiFinishReason::Other,
    }
}

/// Maps an error body onto a provider error, preferring the status name.
pub(crate) fn parse_error_body(http_status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<GeminiApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = format!("{http_status} {}", envelope.error.message);
            match envelope.error.status.as_deref() {
                Some(status) if !status.is_empty() => {
                    let mapped = ProviderError::from_status_name(status, message.clone());
                    if mapped.kind == crate::ProviderErrorKind::Other {
                        ProviderError::from_status(http_status, message)
                    } else {
                        mapped
                    }
                }
                _ => ProviderError::from_status(http_status, message),
            }
        }
        Err(_) => ProviderError::from_status(
            http_status,
            format!("{http_status} Gemini request failed"),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiApiErrorEnvelope {
    pub error: GeminiApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiRequest {
    pub contents: Vec<GeminiApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiApiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<GeminiApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiApiGenerationConfig>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiApiContent {
    pub role: &'static str,
    pub parts: Vec<GeminiApiPart>,
}

impl From<GeminiContent> for GeminiApiContent {
    fn from(value: GeminiContent) -> Self {
        Self {
            role: value.role.as_str(),
            parts: vec![GeminiApiPart { text: value.text }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct GeminiApiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiApiSystemInstruction {
    pub parts: Vec<GeminiApiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiTool {
    pub google_search: GeminiApiGoogleSearch,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiApiGoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiStreamResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiApiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiApiUsage>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub prompt_feedback: Option<GeminiApiPromptFeedback>,
    #[serde(default)]
    pub error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiCandidate {
    #[serde(default)]
    pub content: Option<GeminiApiCandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiApiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiApiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeminiApiUsage {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

impl From<GeminiApiUsage> for GeminiUsage {
    fn from(value: GeminiApiUsage) -> Self {
        Self {
            prompt_token_count: value.prompt_token_count,
            candidates_token_count: value.candidates_token_count,
            total_token_count: value.total_token_count,
        }
    }
}
