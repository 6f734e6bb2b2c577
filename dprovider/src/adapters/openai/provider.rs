//! OpenAI-compatible provider implementation over transport and shared models.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{
    BoxedEventStream, CredentialPool, ProviderClient, ProviderError, ProviderFuture, ProviderId,
    StreamEvent, TurnRequest,
};

use super::transport::OpenAiTransport;
use super::types::{OpenAiMessage, OpenAiRequest, OpenAiRole, OpenAiStreamChunk};

/// Streams turns from a chat completions backend.
///
/// The provider identity comes from the credential pool. The credential is
/// read from the pool on every request, so a rotation takes effect on the
/// next call without rebuilding anything.
#[derive(Clone)]
pub struct OpenAiProvider {
    id: ProviderId,
    credentials: Arc<CredentialPool>,
    transport: Arc<dyn OpenAiTransport>,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(credentials: Arc<CredentialPool>, transport: Arc<dyn OpenAiTransport>) -> Self {
        let id = credentials.provider();
        Self {
            id,
            credentials,
            transport,
            default_model: id.default_model().to_string(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn credentials(&self) -> &Arc<CredentialPool> {
        &self.credentials
    }

    pub(crate) fn build_openai_request(&self, request: TurnRequest) -> OpenAiRequest {
        let model = if request.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(instruction) = request.system_instruction {
            messages.push(OpenAiMessage::new(OpenAiRole::System, instruction));
        }
        messages.extend(request.history.into_iter().map(OpenAiMessage::from));
        messages.push(OpenAiMessage::new(OpenAiRole::User, request.user_text));

        OpenAiRequest {
            model,
            messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            web_search: request.options.web_search && self.id == ProviderId::Zhipu,
            include_usage: self.id != ProviderId::Zhipu,
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("id", &self.id)
            .field("credentials", &self.credentials.len())
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ProviderClient for OpenAiProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn stream_turn<'a>(
        &'a self,
        request: TurnRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let credential = self.credentials.current();
            let openai_request = self.build_openai_request(request);
            let mut chunks = self.transport.stream(openai_request, credential).await?;
            let provider = self.id;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        OpenAiStreamChunk::TextDelta(delta) => yield StreamEvent::TextDelta(delta),
                        OpenAiStreamChunk::Completed(completion) => {
                            yield StreamEvent::ResponseComplete(completion.into_model_response(provider));
                        }
                    }
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}
