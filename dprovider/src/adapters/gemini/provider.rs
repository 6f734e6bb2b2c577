//! Gemini provider implementation over transport and shared models.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{
    BoxedEventStream, CredentialPool, ProviderClient, ProviderError, ProviderFuture, ProviderId,
    StreamEvent, TurnRequest,
};

use super::transport::GeminiTransport;
use super::types::{GeminiContent, GeminiRequest, GeminiRole, GeminiStreamChunk};

#[derive(Clone)]
pub struct GeminiProvider {
    credentials: Arc<CredentialPool>,
    transport: Arc<dyn GeminiTransport>,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(
        credentials: Arc<CredentialPool>,
        transport: Arc<dyn GeminiTransport>,
    ) -> Result<Self, ProviderError> {
        if credentials.provider() != ProviderId::Gemini {
            return Err(ProviderError::invalid_request(format!(
                "Gemini provider cannot use {} credentials",
                credentials.provider().display_name()
            )));
        }

        Ok(Self {
            credentials,
            transport,
            default_model: ProviderId::Gemini.default_model().to_string(),
        })
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn credentials(&self) -> &Arc<CredentialPool> {
        &self.credentials
    }

    pub(crate) fn build_gemini_request(&self, request: TurnRequest) -> GeminiRequest {
        let model = if request.model.trim().is_empty() {
            self.default_model.clone()
        } else {
            request.model
        };

        let mut contents = request
            .history
            .into_iter()
            .map(GeminiContent::from)
            .collect::<Vec<_>>();
        contents.push(GeminiContent {
            role: GeminiRole::User,
            text: request.user_text,
        });

        GeminiRequest {
            model,
            contents,
            system_instruction: request.system_instruction,
            google_search: request.options.web_search,
            temperature: request.options.temperature,
            max_output_tokens: request.options.max_tokens,
        }
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credentials", &self.credentials.len())
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl ProviderClient for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
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
            let gemini_request = self.build_gemini_request(request);
            let mut chunks = self.transport.stream(gemini_request, credential).await?;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        GeminiStreamChunk::TextDelta(delta) => yield StreamEvent::TextDelta(delta),
                        GeminiStreamChunk::Completed(completion) => {
                            yield StreamEvent::ResponseComplete(completion.into_model_response());
                        }
                    }
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}
