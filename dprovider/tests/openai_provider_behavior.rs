#![cfg(feature = "provider-openai")]

use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};

use dprovider::adapters::openai::{
    OpenAiChunkStream, OpenAiCompletion, OpenAiFinishReason, OpenAiProvider, OpenAiRequest,
    OpenAiStreamChunk, OpenAiTransport, OpenAiUsage,
};
use dprovider::{
    Credential, CredentialPool, ProviderClient, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderId, StopReason, StreamEvent, Turn, TurnRequest,
};

#[derive(Debug, Default)]
struct FakeTransport {
    seen_keys: Mutex<Vec<String>>,
    captured_request: Mutex<Option<OpenAiRequest>>,
    reject_with: Option<ProviderError>,
}

impl OpenAiTransport for FakeTransport {
    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        credential: Arc<Credential>,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            self.seen_keys
                .lock()
                .expect("keys lock")
                .push(credential.expose().to_string());
            let model = request.model.clone();
            *self.captured_request.lock().expect("request lock") = Some(request);

            if let Some(error) = &self.reject_with {
                return Err(error.clone());
            }

            let chunks = vec![
                Ok(OpenAiStreamChunk::TextDelta("你好".to_string())),
                Ok(OpenAiStreamChunk::TextDelta(", world".to_string())),
                Ok(OpenAiStreamChunk::Completed(OpenAiCompletion {
                    model,
                    content: "你好, world".to_string(),
                    finish_reason: OpenAiFinishReason::Stop,
                    usage: OpenAiUsage {
                        prompt_tokens: 9,
                        completion_tokens: 4,
                        total_tokens: 13,
                    },
                })),
            ];
            Ok(Box::pin(stream::iter(chunks)) as OpenAiChunkStream<'a>)
        })
    }
}

fn pool(id: ProviderId, keys: &[&str]) -> Arc<CredentialPool> {
    Arc::new(CredentialPool::with_cursor(id, keys.iter().copied(), 0).expect("pool"))
}

#[tokio::test]
async fn stream_turn_relays_deltas_and_completion() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(pool(ProviderId::Zhipu, &["zhipu-key-000001"]), transport.clone());

    let mut events = provider
        .stream_turn(TurnRequest::new(
            "glm-4.6",
            vec![Turn::user("hi"), Turn::model("hello")],
            "translate",
        ))
        .await
        .expect("stream should open");

    let mut deltas = Vec::new();
    let mut completed = None;
    while let Some(event) = events.next().await {
        match event.expect("event should be ok") {
            StreamEvent::TextDelta(delta) => deltas.push(delta),
            StreamEvent::ResponseComplete(response) => completed = Some(response),
        }
    }

    assert_eq!(deltas, vec!["你好".to_string(), ", world".to_string()]);
    let response = completed.expect("completion event");
    assert_eq!(response.provider, ProviderId::Zhipu);
    assert_eq!(response.text, deltas.concat());
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.total_tokens, 13);

    let captured = transport
        .captured_request
        .lock()
        .expect("request lock")
        .clone()
        .expect("request captured");
    assert_eq!(captured.messages.len(), 3);
}

#[tokio::test]
async fn rotation_changes_the_key_used_by_the_next_request() {
    let transport = Arc::new(FakeTransport::default());
    let credentials = pool(ProviderId::DeepSeek, &["first-key-00001", "second-key-0002"]);
    let provider = OpenAiProvider::new(Arc::clone(&credentials), transport.clone());

    for _ in 0..2 {
        let request = TurnRequest::new("deepseek-chat", Vec::new(), "ping");
        let _ = provider.stream_turn(request).await.expect("stream should open");
        credentials.rotate();
    }

    let keys = transport.seen_keys.lock().expect("keys lock").clone();
    assert_eq!(keys, vec!["first-key-00001".to_string(), "second-key-0002".to_string()]);
}

#[tokio::test]
async fn transport_rejection_surfaces_before_streaming() {
    let transport = Arc::new(FakeTransport {
        reject_with: Some(ProviderError::from_status(429, "429 rate limit reached")),
        ..FakeTransport::default()
    });
    let provider = OpenAiProvider::new(pool(ProviderId::OpenAi, &["sk-test-000001"]), transport);

    let error = provider
        .stream_turn(TurnRequest::new("gpt-4o-mini", Vec::new(), "hi"))
        .await
        .err()
        .expect("request should fail");
    assert_eq!(error.kind, ProviderErrorKind::RateLimited);
}

#[tokio::test]
async fn invalid_history_is_rejected_without_calling_transport() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(pool(ProviderId::OpenAi, &["sk-test-000001"]), transport.clone());

    let error = provider
        .stream_turn(TurnRequest::new("gpt-4o-mini", vec![Turn::user("dangling")], "hi"))
        .await
        .err()
        .expect("request should fail");

    assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    assert!(transport.seen_keys.lock().expect("keys lock").is_empty());
}
