//! OpenAI-compatible transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response};

use crate::adapters::sse::{SseLineBuffer, map_send_error};
use crate::{Credential, ProviderError, ProviderFuture, ProviderId};

use super::serde_api::{
    OpenAiApiStreamResponse, build_api_request, extract_error_message, parse_finish_reason,
};
use super::types::{
    OpenAiCompletion, OpenAiFinishReason, OpenAiRequest, OpenAiStreamChunk, OpenAiUsage,
};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ZHIPU_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// Base URL for providers that speak the chat completions protocol.
pub fn default_base_url(provider: ProviderId) -> Option<&'static str> {
    match provider {
        ProviderId::OpenAi => Some(OPENAI_BASE_URL),
        ProviderId::Zhipu => Some(ZHIPU_BASE_URL),
        ProviderId::DeepSeek => Some(DEEPSEEK_BASE_URL),
        ProviderId::Gemini => None,
    }
}

pub type OpenAiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<OpenAiStreamChunk, ProviderError>> + Send + 'a>>;

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        credential: Arc<Credential>,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn for_provider(client: Client, provider: ProviderId) -> Self {
        let transport = Self::new(client);
        match default_base_url(provider) {
            Some(base_url) => transport.with_base_url(base_url),
            None => transport,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = extract_error_message(&body)
            .unwrap_or_else(|| format!("chat completion request failed with status {status}"));

        ProviderError::from_status(status.as_u16(), format!("{} {detail}", status.as_u16()))
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        credential: Arc<Credential>,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            let mut accumulator = CompletionAccumulator::new(request.model.clone());
            let api_request = build_api_request(request)?;
            let url = self.endpoint("chat/completions");
            let response = self
                .client
                .post(url)
                .bearer_auth(credential.expose())
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
                            yield OpenAiStreamChunk::TextDelta(delta);
                        }
                    }

                    if accumulator.is_done() {
                        break;
                    }
                }

                if !accumulator.is_done() {
                    let trailing = lines.finish()?;
                    if let Some(payload) = trailing {
                        if let Some(delta) = accumulator.accept(&payload)? {
                            yield OpenAiStreamChunk::TextDelta(delta);
                        }
                    }
                }

                yield OpenAiStreamChunk::Completed(accumulator.finish());
            };

            Ok(Box::pin(stream) as OpenAiChunkStream<'a>)
        })
    }
}

/// Folds `data:` payloads into text deltas and one final completion.
#[derive(Debug)]
pub(crate) struct CompletionAccumulator {
    requested_model: String,
    model: Option<String>,
    content: String,
    finish_reason: OpenAiFinishReason,
    usage: OpenAiUsage,
    done: bool,
}

impl CompletionAccumulator {
    pub(crate) fn new(requested_model: String) -> Self {
        Self {
            requested_model,
            model: None,
            content: String::new(),
            finish_reason: OpenAiFinishReason::Other,
            usage: OpenAiUsage::default(),
            done: false,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// Returns the non-empty text delta carried by `payload`, if any.
    pub(crate) fn accept(&mut self, payload: &str) -> Result<Option<String>, ProviderError> {
        if payload == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let parsed: OpenAiApiStreamResponse = serde_json::from_str(payload)
            .map_err(|err| ProviderError::transport(format!("malformed stream chunk: {err}")))?;

        if let Some(error) = parsed.error {
            return Err(error.into_provider_error());
        }

        if self.model.is_none() {
            self.model = parsed.model.filter(|model| !model.is_empty());
        }

        if let Some(usage) = parsed.usage {
            self.usage = usage.into();
        }

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Ok(None);
        };

        if choice.finish_reason.is_some() {
            self.finish_reason = parse_finish_reason(choice.finish_reason.as_deref());
        }

        match choice.delta.content {
            Some(delta) if !delta.is_empty() => {
                self.content.push_str(&delta);
                Ok(Some(delta))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn finish(self) -> OpenAiCompletion {
        OpenAiCompletion {
            model: self.model.unwrap_or(self.requested_model),
            content: self.content,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}
