//! Focused unit tests for Gemini adapter internals.

#![cfg(test)]

use std::sync::Arc;

use futures_util::stream;

use crate::{
    Credential, CredentialPool, GenerationOptions, ProviderError, ProviderErrorKind,
    ProviderFuture, ProviderId, StopReason, Turn, TurnRequest,
};

use super::provider::GeminiProvider;
use super::serde_api::{build_api_request, parse_error_body, parse_finish_reason};
use super::transport::{CandidateAccumulator, GeminiChunkStream, GeminiTransport};
use super::types::{GeminiFinishReason, GeminiRole};

#[derive(Debug)]
struct NoopTransport;

impl GeminiTransport for NoopTransport {
    fn stream<'a>(
        &'a self,
        _request: super::types::GeminiRequest,
        _credential: Arc<Credential>,
    ) -> ProviderFuture<'a, Result<GeminiChunkStream<'a>, ProviderError>> {
        Box::pin(async {
            let output = stream::iter(vec![Err(ProviderError::other("not used"))]);
            Ok(Box::pin(output) as GeminiChunkStream<'a>)
        })
    }
}

fn provider() -> GeminiProvider {
    let pool = CredentialPool::with_cursor(ProviderId::Gemini, ["AIzaSy-test-0001"], 0)
        .expect("pool");
    GeminiProvider::new(Arc::new(pool), Arc::new(NoopTransport)).expect("provider")
}

#[test]
fn rejects_credentials_for_another_provider() {
    let pool = CredentialPool::with_cursor(ProviderId::Zhipu, ["zhipu-key-0001"], 0).expect("pool");
    let error = GeminiProvider::new(Arc::new(pool), Arc::new(NoopTransport))
        .expect_err("wrong provider");
    assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
}

#[test]
fn request_maps_history_system_instruction_and_search() {
    let request = TurnRequest::new(
        "gemini-2.5-flash",
        vec![Turn::user("hi"), Turn::model("hello")],
        "latest news?",
    )
    .with_system_instruction("answer in one line")
    .with_options(
        GenerationOptions::default()
            .with_temperature(0.7)
            .enable_web_search(),
    );

    let built = provider().build_gemini_request(request);
    assert_eq!(built.contents.len(), 3);
    assert_eq!(built.contents[1].role, GeminiRole::Model);
    assert_eq!(built.contents[2].text, "latest news?");
    assert!(built.google_search);

    let api = build_api_request(built).expect("request should build");
    let json = serde_json::to_value(&api).expect("serialize");
    assert_eq!(json["contents"][1]["role"], "model");
    assert_eq!(json["contents"][2]["parts"][0]["text"], "latest news?");
    assert_eq!(json["systemInstruction"]["parts"][0]["text"], "answer in one line");
    assert!(json["tools"][0]["googleSearch"].is_object());
    assert!(json["generationConfig"]["temperature"].is_number());
    assert!(json["generationConfig"].get("maxOutputTokens").is_none());
}

#[test]
fn search_and_generation_config_are_omitted_when_unset() {
    let built = provider().build_gemini_request(TurnRequest::new("", Vec::new(), "hi"));
    assert_eq!(built.model, "gemini-2.5-flash");

    let json = serde_json::to_value(build_api_request(built).expect("build")).expect("serialize");
    assert!(json.get("tools").is_none());
    assert!(json.get("generationConfig").is_none());
    assert!(json.get("systemInstruction").is_none());
}

#[test]
fn finish_reasons_map_to_stop_reasons() {
    assert_eq!(parse_finish_reason(Some("STOP")), GeminiFinishReason::Stop);
    assert_eq!(
        parse_finish_reason(Some("MAX_TOKENS")),
        GeminiFinishReason::MaxTokens
    );
    assert_eq!(
        parse_finish_reason(Some("RECITATION")),
        GeminiFinishReason::Safety
    );
    assert_eq!(parse_finish_reason(None), GeminiFinishReason::Other);
}

#[test]
fn accumulator_joins_parts_and_keeps_last_usage() {
    let mut accumulator = CandidateAccumulator::new("gemini-2.5-flash".to_string());

    let first = accumulator
        .accept(r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}],"usageMetadata":{"promptTokenCount":5},"modelVersion":"gemini-2.5-flash-001"}"#)
        .expect("first chunk");
    assert_eq!(first.as_deref(), Some("Hello"));

    let second = accumulator
        .accept(r#"{"candidates":[{"content":{"parts":[{"text":" there"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":3,"totalTokenCount":8}}"#)
        .expect("second chunk");
    assert_eq!(second.as_deref(), Some(" there"));

    let response = accumulator.finish().into_model_response();
    assert_eq!(response.text, "Hello there");
    assert_eq!(response.model, "gemini-2.5-flash-001");
    assert_eq!(response.stop_reason, StopReason::EndTurn);
    assert_eq!(response.usage.total_tokens, 8);
    assert_eq!(response.usage.output_tokens, 3);
}

#[test]
fn blocked_prompt_is_an_invalid_request() {
    let mut accumulator = CandidateAccumulator::new("gemini-2.5-flash".to_string());
    let error = accumulator
        .accept(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
        .expect_err("blocked");
    assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
}

#[test]
fn error_bodies_prefer_status_names() {
    let exhausted = parse_error_body(
        429,
        r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
    );
    assert_eq!(exhausted.kind, ProviderErrorKind::RateLimited);
    assert!(exhausted.message.starts_with("429"));

    let overloaded = parse_error_body(
        503,
        r#"{"error":{"code":503,"message":"The model is overloaded","status":"UNAVAILABLE"}}"#,
    );
    assert_eq!(overloaded.kind, ProviderErrorKind::Unavailable);

    let opaque = parse_error_body(500, "<html>oops</html>");
    assert_eq!(opaque.kind, ProviderErrorKind::Unavailable);

    let unknown_status = parse_error_body(400, r#"{"error":{"message":"bad","status":"WEIRD"}}"#);
    assert_eq!(unknown_status.kind, ProviderErrorKind::InvalidRequest);
}
