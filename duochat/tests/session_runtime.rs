use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use duochat::commands::{Command, CommandOutcome, execute};
use duochat::prelude::*;
use duochat::providers::ProviderSet;
use duochat::{
    BoxedEventStream, CredentialPool, ModelResponse, ProviderFuture, StopReason, StreamEvent,
    TokenUsage, TurnRequest,
};
use futures_util::{StreamExt, stream};

enum Step {
    Reply(&'static str),
    Hang(&'static str),
}

struct FakeProvider {
    id: ProviderId,
    steps: Mutex<VecDeque<Step>>,
}

impl FakeProvider {
    fn new(id: ProviderId, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            id,
            steps: Mutex::new(steps.into()),
        })
    }
}

impl ProviderClient for FakeProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn stream_turn<'a>(
        &'a self,
        request: TurnRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let step = self
                .steps
                .lock()
                .expect("steps lock")
                .pop_front()
                .unwrap_or(Step::Reply("ok"));

            let stream: BoxedEventStream<'a> = match step {
                Step::Reply(text) => Box::pin(stream::iter(vec![
                    Ok(StreamEvent::TextDelta(text.to_string())),
                    Ok(StreamEvent::ResponseComplete(ModelResponse {
                        provider: self.id,
                        model: request.model,
                        text: text.to_string(),
                        stop_reason: StopReason::EndTurn,
                        usage: TokenUsage::new(4, 6),
                    })),
                ])),
                Step::Hang(text) => Box::pin(
                    stream::iter(vec![Ok(StreamEvent::TextDelta(text.to_string()))])
                        .chain(stream::pending()),
                ),
            };
            Ok(stream)
        })
    }
}

fn slot(provider: Arc<FakeProvider>) -> ProviderSlot {
    let id = provider.id;
    let pool = CredentialPool::with_cursor(id, [format!("{id}-key-0001")], 0).expect("pool");
    ProviderSlot::new(provider, Arc::new(pool))
}

fn orchestrator(steps: Vec<Step>) -> ChatOrchestrator {
    ChatOrchestrator::builder(slot(FakeProvider::new(ProviderId::Gemini, steps)))
        .fallback(slot(FakeProvider::new(ProviderId::Zhipu, Vec::new())))
        .build()
        .expect("orchestrator")
}

async fn drain(mut events: tokio::sync::mpsc::Receiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn submitted_turns_stream_events_over_the_channel() {
    let session =
        ChatSessionHandle::new(orchestrator(vec![Step::Reply("first"), Step::Reply("second")]));

    assert_eq!(
        drain(session.submit("one").await).await,
        vec![
            ChatEvent::TextFragment("first".to_string()),
            ChatEvent::TokenStats { turn_tokens: 10 },
        ]
    );
    assert_eq!(
        drain(session.submit("two").await).await,
        vec![
            ChatEvent::TextFragment("second".to_string()),
            ChatEvent::TokenStats { turn_tokens: 10 },
        ]
    );

    let orchestrator = session.lock().await;
    assert_eq!(
        orchestrator.history(),
        &turns![user => "one", model => "first", user => "two", model => "second"][..]
    );
    assert_eq!(orchestrator.session_tokens(), 20);
}

#[tokio::test]
async fn back_to_back_submissions_run_in_order() {
    let session = ChatSessionHandle::new(orchestrator(vec![
        Step::Reply("first"),
        Step::Reply("second"),
        Step::Reply("third"),
    ]));

    let one = session.submit("one").await;
    let two = session.submit("two").await;
    let three = session.submit("three").await;

    assert_eq!(drain(three).await[0], ChatEvent::TextFragment("third".to_string()));
    assert_eq!(drain(one).await[0], ChatEvent::TextFragment("first".to_string()));
    assert_eq!(drain(two).await[0], ChatEvent::TextFragment("second".to_string()));

    let orchestrator = session.lock().await;
    assert_eq!(
        orchestrator.history(),
        &turns![
            user => "one", model => "first",
            user => "two", model => "second",
            user => "three", model => "third",
        ][..]
    );
}

#[tokio::test]
async fn dropping_the_receiver_cancels_the_turn() {
    let session = ChatSessionHandle::new(orchestrator(vec![Step::Hang("partial")]));

    let mut events = session.submit("never finishes").await;
    assert_eq!(
        events.recv().await,
        Some(ChatEvent::TextFragment("partial".to_string()))
    );
    drop(events);

    let orchestrator = session.lock().await;
    assert!(orchestrator.history().is_empty());
    assert_eq!(orchestrator.phase(), TurnPhase::Idle);
}

#[tokio::test]
async fn blank_submission_closes_without_events() {
    let session = ChatSessionHandle::new(orchestrator(Vec::new()));

    assert!(drain(session.submit("   ").await).await.is_empty());
    assert_eq!(session.lock().await.turn_count(), 0);
}

#[tokio::test]
async fn commands_drive_the_orchestrator() {
    let session = ChatSessionHandle::new(orchestrator(vec![Step::Reply("hello")]));
    drain(session.submit("hi").await).await;

    let mut orchestrator = session.lock().await;

    let CommandOutcome::Reply(stats) = execute(&mut orchestrator, Command::Stats) else {
        panic!("stats should reply");
    };
    assert!(stats.contains("requests 1/15"));
    assert!(stats.contains("session tokens 10"));

    assert_eq!(
        execute(&mut orchestrator, Command::Undo),
        CommandOutcome::Reply("Removed the last exchange; 0 left.".to_string())
    );
    assert_eq!(
        execute(&mut orchestrator, Command::Undo),
        CommandOutcome::Reply("Nothing to undo.".to_string())
    );

    assert_eq!(
        execute(&mut orchestrator, Command::Switch),
        CommandOutcome::Reply("Now using Zhipu GLM (fallback) with glm-4.6v.".to_string())
    );
    assert_eq!(
        execute(&mut orchestrator, Command::Model(None)),
        CommandOutcome::Reply("Model set to glm-4.6.".to_string())
    );

    let CommandOutcome::Reply(rejected) =
        execute(&mut orchestrator, Command::Model(Some("gpt-4o".to_string())))
    else {
        panic!("model should reply");
    };
    assert!(rejected.starts_with("gpt-4o is not available for Zhipu GLM"));
    assert_eq!(orchestrator.model(), "glm-4.6");

    assert_eq!(execute(&mut orchestrator, Command::Exit), CommandOutcome::Exit);
}

#[test]
fn runtime_applies_config_to_orchestrator() {
    let mut config = ChatConfig::default();
    config.max_history_turns = 4;
    config.temperature = 0.3;

    let providers = ProviderSet {
        primary: slot(FakeProvider::new(ProviderId::Gemini, Vec::new())),
        fallback: None,
    };

    let orchestrator = build_orchestrator(&config, providers).expect("orchestrator");

    assert_eq!(orchestrator.service_name(), "Gemini");
    assert_eq!(orchestrator.model(), "gemini-2.5-flash");
    assert!(!orchestrator.has_fallback());
}
