//! Gemini transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response};

use crate::adapters::sse::{SseLineBuffer, map_send_error};
use crate::{Credential, ProviderError, ProviderFuture};

use super::serde_api::{
    GeminiApiStreamResponse, build_api_request, parse_error_body, parse_finish_reason,
};
use super::types::{
    GeminiCompletion, GeminiFinishReason, GeminiRequest, GeminiStreamChunk, GeminiUsage,
};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub type GeminiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<GeminiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait GeminiTransport: Send + Sync + std::fmt::Debug {
    fn stream<'a>(
        &'a self,
        request: GeminiRequest,
        credential: Arc<Credential>,
    ) -> ProviderFuture<'a, Result<GeminiChunkStream<'a>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct GeminiHttpTransport {
    client: Client,
    base_url: String,
}

impl GeminiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn stream_endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        parse_error_body(status, &body)
    }
}

impl GeminiTransport for GeminiHttpTransport {
    fn stream<'a>(
        &'a self,
        request: GeminiRequest,
        credential: Arc<Credential>,
    ) -> ProviderFuture<'a, Result<GeminiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            let url = self.stream_endpoint(&request.model);
            let mut accumulator = CandidateAccumulator::new(request.model.clone());
            let api_request = build_api_request(request)?;
            let response = self
                .client
                .post(url)
                .header("x-goog-api-key", credential.expose())
                .json(&api_request)
                .send()
                .await
                .map_err(map_send_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut lines = SseLineBuffer::new();

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(map_send_error)?;
                    for payload in lines.push(&bytes)? {
                        if let Some(delta) = accumulator.accept(&payload)? {
                            yield GeminiStreamChunk::TextDelta(delta);
                        }
                    }
                }

                let trailing = lines.finish()?;
                if let Some(payload) = trailing {
                    if let Some(delta) = accumulator.accept(&payload)? {
                        yield GeminiStreamChunk::TextDelta(delta);
                    }
                }

                yield GeminiStreamChunk::Completed(accumulator.finish());
            };

            Ok(Box::pin(stream) as GeminiChunkStream<'a>)
        })
    }
}

/// Folds `GenerateContentResponse` chunks into deltas and one completion.
///
/// Gemini repeats `usageMetadata` on several chunks; the last report wins.
#[derive(Debug)]
pub(crate) struct CandidateAccumulator {
    requested_model: String,
    model: Option<String>,
    text: String,
    finish_reason: GeminiFinishReason,
    usage: GeminiUsage,
}

impl CandidateAccumulator {
    pub(crate) fn new(requested_model: String) -> Self {
        Self {
            requested_model,
            model: None,
            text: String::new(),
            finish_reason: GeminiFinishReason::Other,
            usage: GeminiUsage::default(),
        }
    }

    pub(crate) fn accept(&mut self, payload: &str) -> Result<Option<String>, ProviderError> {
        let parsed: GeminiApiStreamResponse = serde_json::from_str(payload)
            .map_err(|err| ProviderError::transport(format!("malformed stream chunk: {err}")))?;

        if let Some(error) = parsed.error {
            let status = error.status.unwrap_or_default();
            return Err(ProviderError::from_status_name(
                &status,
                format!("{status} {}", error.message),
            ));
        }

        if let Some(usage) = parsed.usage_metadata {
            self.usage = usage.into();
        }

        if self.model.is_none() {
            self.model = parsed.model_version.filter(|model| !model.is_empty());
        }

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            if let Some(reason) = parsed.prompt_feedback.and_then(|feedback| feedback.block_reason) {
                return Err(ProviderError::invalid_request(format!(
                    "prompt blocked by Gemini: {reason}"
                )));
            }
            return Ok(None);
        };

        if candidate.finish_reason.is_some() {
            self.finish_reason = parse_finish_reason(candidate.finish_reason.as_deref());
        }

        let delta = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if delta.is_empty() {
            return Ok(None);
        }

        self.text.push_str(&delta);
        Ok(Some(delta))
    }

    pub(crate) fn finish(self) -> GeminiCompletion {
        GeminiCompletion {
            model: self.model.unwrap_or(self.requested_model),
            text: self.text,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}
