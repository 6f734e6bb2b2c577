//! Retry, credential rotation, and failover around a single chat turn.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use dcommon::{BoxFuture, GenerationOptions, SessionId, estimate_tokens, truncate_chars};
use dprovider::{
    CredentialPool, NoopOperationHooks, ProviderClient, ProviderError, ProviderId,
    ProviderOperationHooks, RateMonitor, RateStats, RetryPolicy, StreamEvent, TokenUsage, Turn,
    TurnRequest,
};
use futures_util::StreamExt;

use crate::history::DEFAULT_MAX_HISTORY_TURNS;
use crate::{
    ActiveProvider, ChatError, ChatEvent, ChatEventStream, ChatHooks, ConversationState,
    FailureClass, NoopChatHooks, TurnPhase, classify,
};

pub const DEFAULT_CONTEXT_WARNING_TOKENS: u64 = 900_000;

const STREAM_OPERATION: &str = "stream_turn";
const ERROR_DETAIL_CHARS: usize = 100;

/// Waits between retries. Swapped for a recording fake in tests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TimerSleeper;

impl Sleeper for TimerSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(futures_timer::Delay::new(duration))
    }
}

/// One backend as seen by the orchestrator: a client plus the credential
/// pool it reads from and the monitor that records its usage.
#[derive(Clone)]
pub struct ProviderSlot {
    client: Arc<dyn ProviderClient>,
    credentials: Arc<CredentialPool>,
    rate_monitor: Arc<RateMonitor>,
    models: Vec<String>,
    default_model: Option<String>,
}

impl ProviderSlot {
    pub fn new(client: Arc<dyn ProviderClient>, credentials: Arc<CredentialPool>) -> Self {
        let models = client
            .id()
            .model_catalog()
            .iter()
            .map(|model| model.to_string())
            .collect();

        Self {
            client,
            credentials,
            rate_monitor: Arc::new(RateMonitor::default()),
            models,
            default_model: None,
        }
    }

    pub fn with_rate_monitor(mut self, rate_monitor: Arc<RateMonitor>) -> Self {
        self.rate_monitor = rate_monitor;
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models
            .into_iter()
            .map(Into::into)
            .filter(|model: &String| !model.trim().is_empty())
            .collect();
        self
    }

    /// Overrides the client's own default model, e.g. from configuration.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.default_model = (!model.trim().is_empty()).then_some(model);
        self
    }

    pub fn id(&self) -> ProviderId {
        self.client.id()
    }

    pub fn default_model(&self) -> &str {
        self.default_model
            .as_deref()
            .unwrap_or_else(|| self.client.default_model())
    }

    pub fn client(&self) -> &Arc<dyn ProviderClient> {
        &self.client
    }

    pub fn credentials(&self) -> &Arc<CredentialPool> {
        &self.credentials
    }

    pub fn rate_monitor(&self) -> &Arc<RateMonitor> {
        &self.rate_monitor
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

impl std::fmt::Debug for ProviderSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("provider", &self.id())
            .field("credentials", &self.credentials.len())
            .field("models", &self.models)
            .field("default_model", &self.default_model())
            .finish()
    }
}

pub struct ChatOrchestratorBuilder {
    primary: ProviderSlot,
    fallback: Option<ProviderSlot>,
    system_instruction: Option<String>,
    options: GenerationOptions,
    max_history_turns: usize,
    retry_policy: RetryPolicy,
    provider_hooks: Arc<dyn ProviderOperationHooks>,
    chat_hooks: Arc<dyn ChatHooks>,
    sleeper: Arc<dyn Sleeper>,
    session_id: SessionId,
    context_warning_tokens: u64,
}

impl ChatOrchestratorBuilder {
    pub fn new(primary: ProviderSlot) -> Self {
        Self {
            primary,
            fallback: None,
            system_instruction: None,
            options: GenerationOptions::default(),
            max_history_turns: DEFAULT_MAX_HISTORY_TURNS,
            retry_policy: RetryPolicy::default(),
            provider_hooks: Arc::new(NoopOperationHooks),
            chat_hooks: Arc::new(NoopChatHooks),
            sleeper: Arc::new(TimerSleeper),
            session_id: SessionId::default(),
            context_warning_tokens: DEFAULT_CONTEXT_WARNING_TOKENS,
        }
    }

    pub fn fallback(mut self, fallback: ProviderSlot) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        self.system_instruction = (!instruction.trim().is_empty()).then_some(instruction);
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_history_turns(mut self, max_turns: usize) -> Self {
        self.max_history_turns = max_turns;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn provider_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.provider_hooks = hooks;
        self
    }

    pub fn chat_hooks(mut self, hooks: Arc<dyn ChatHooks>) -> Self {
        self.chat_hooks = hooks;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn session_id(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn context_warning_tokens(mut self, threshold: u64) -> Self {
        self.context_warning_tokens = threshold;
        self
    }

    pub fn build(self) -> Result<ChatOrchestrator, ChatError> {
        if let Some(fallback) = &self.fallback
            && fallback.id() == self.primary.id()
        {
            return Err(ChatError::configuration(format!(
                "fallback provider must differ from primary ({})",
                self.primary.id()
            )));
        }

        let model = self.primary.default_model().to_string();
        Ok(ChatOrchestrator {
            primary: self.primary,
            fallback: self.fallback,
            active: ActiveProvider::Primary,
            model,
            system_instruction: self.system_instruction,
            options: self.options,
            history: ConversationState::new(self.max_history_turns),
            retry_policy: self.retry_policy,
            provider_hooks: self.provider_hooks,
            chat_hooks: self.chat_hooks,
            sleeper: self.sleeper,
            session_id: self.session_id,
            context_warning_tokens: self.context_warning_tokens,
            phase: TurnPhase::Idle,
            session_tokens: 0,
        })
    }
}

/// Owns one conversation and drives each turn against the active provider.
///
/// `send_turn` borrows the orchestrator mutably for as long as its event
/// stream lives, so turns never overlap.
pub struct ChatOrchestrator {
    primary: ProviderSlot,
    fallback: Option<ProviderSlot>,
    active: ActiveProvider,
    model: String,
    system_instruction: Option<String>,
    options: GenerationOptions,
    history: ConversationState,
    retry_policy: RetryPolicy,
    provider_hooks: Arc<dyn ProviderOperationHooks>,
    chat_hooks: Arc<dyn ChatHooks>,
    sleeper: Arc<dyn Sleeper>,
    session_id: SessionId,
    context_warning_tokens: u64,
    phase: TurnPhase,
    session_tokens: u64,
}

impl ChatOrchestrator {
    pub fn builder(primary: ProviderSlot) -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder::new(primary)
    }

    /// Runs one user turn and streams its events.
    ///
    /// Blank input yields an empty stream and changes nothing. Otherwise the
    /// stream ends with either `TokenStats` or `Error`. Dropping the stream
    /// early cancels the turn and retracts its user message.
    pub fn send_turn(&mut self, user_text: impl Into<String>) -> ChatEventStream<'_> {
        let user_text = user_text.into();
        let Self {
            primary,
            fallback,
            active,
            model,
            system_instruction,
            options,
            history,
            retry_policy,
            provider_hooks,
            chat_hooks,
            sleeper,
            session_id,
            context_warning_tokens,
            phase,
            session_tokens,
        } = self;

        Box::pin(stream! {
            if user_text.trim().is_empty() {
                return;
            }

            let estimated = history.estimated_tokens();
            if estimated > *context_warning_tokens {
                chat_hooks.on_context_warning(session_id, estimated, *context_warning_tokens);
                yield ChatEvent::SystemNotice(format!(
                    "Conversation is about {estimated} tokens, past the {} token budget. Consider /clear to start fresh.",
                    context_warning_tokens
                ));
            }

            let mut tracker = PhaseTracker {
                phase,
                hooks: chat_hooks.as_ref(),
                session: session_id,
            };
            let pending = history.begin_turn(user_text);
            let mut failed_over = false;

            loop {
                let slot: &ProviderSlot = match (*active, fallback.as_ref()) {
                    (ActiveProvider::Fallback, Some(slot)) => slot,
                    _ => &*primary,
                };
                let provider = slot.id();
                chat_hooks.on_turn_start(session_id, provider, model);

                let mut retry = 0_u32;
                let outcome = loop {
                    let attempt = retry + 1;
                    tracker.set(TurnPhase::Sending);
                    provider_hooks.on_attempt_start(provider, STREAM_OPERATION, attempt);

                    let request = TurnRequest::new(
                        model.clone(),
                        pending.prior_turns().to_vec(),
                        pending.user_text(),
                    )
                    .with_system_instruction(system_instruction.clone().unwrap_or_default())
                    .with_options(*options);

                    let mut buffer = String::new();
                    let mut usage = TokenUsage::default();
                    let mut completed_text = None::<String>;
                    let mut failure = None::<ProviderError>;

                    match slot.client.stream_turn(request).await {
                        Ok(mut events) => {
                            while let Some(item) = events.next().await {
                                match item {
                                    Ok(StreamEvent::TextDelta(delta)) => {
                                        tracker.set(TurnPhase::Streaming);
                                        buffer.push_str(&delta);
                                        yield ChatEvent::TextFragment(delta);
                                    }
                                    Ok(StreamEvent::ResponseComplete(response)) => {
                                        usage = response.usage;
                                        completed_text = Some(response.text);
                                    }
                                    Err(error) => {
                                        failure = Some(error);
                                        break;
                                    }
                                }
                            }
                        }
                        Err(error) => failure = Some(error),
                    }

                    if failure.is_none() {
                        if buffer.is_empty() {
                            buffer = completed_text.unwrap_or_default();
                        }

                        if !buffer.trim().is_empty() {
                            provider_hooks.on_success(provider, STREAM_OPERATION, attempt);
                            break Ok((buffer, usage));
                        }
                    }

                    let error = failure.unwrap_or_else(|| {
                        ProviderError::other("model returned an empty response")
                    });
                    let class = classify(&error);

                    if class == FailureClass::RateLimited && retry_policy.allows_retry(retry + 1) {
                        retry += 1;
                        tracker.set(TurnPhase::RateLimited);
                        yield ChatEvent::ReconnectAttempt {
                            attempt: retry,
                            max_attempts: retry_policy.max_retries,
                        };

                        let rotated = slot.credentials.rotate();
                        if rotated {
                            provider_hooks
                                .on_credential_rotated(provider, slot.credentials.current().masked());
                        }

                        let delay = retry_policy.backoff_for_retry(retry, rotated);
                        provider_hooks.on_retry_scheduled(
                            provider,
                            STREAM_OPERATION,
                            attempt,
                            delay,
                            &error,
                        );
                        sleeper.sleep(delay).await;
                        continue;
                    }

                    provider_hooks.on_failure(provider, STREAM_OPERATION, attempt, &error);
                    break Err((class, error));
                };

                match outcome {
                    Ok((text, usage)) => {
                        let usage = if usage.is_unreported() {
                            TokenUsage::new(
                                estimate_tokens(pending.user_text()),
                                estimate_tokens(&text),
                            )
                        } else {
                            usage
                        };
                        let turn_tokens = if usage.total_tokens == 0 {
                            usage.input_tokens.saturating_add(usage.output_tokens)
                        } else {
                            usage.total_tokens
                        };

                        slot.rate_monitor.record(usage.input_tokens, usage.output_tokens);
                        let evicted = pending.commit(text);
                        if evicted > 0 {
                            chat_hooks.on_history_evicted(session_id, evicted);
                        }

                        *session_tokens += u64::from(turn_tokens);
                        chat_hooks.on_turn_complete(session_id, provider, turn_tokens);
                        yield ChatEvent::TokenStats { turn_tokens };
                        tracker.set(TurnPhase::Idle);
                        break;
                    }
                    Err((class, error)) => {
                        if class == FailureClass::Unavailable {
                            tracker.set(TurnPhase::Unavailable);
                        }

                        let failover_target = if class.allows_failover()
                            && !failed_over
                            && *active == ActiveProvider::Primary
                        {
                            fallback.as_ref()
                        } else {
                            None
                        };

                        if let Some(next) = failover_target {
                            failed_over = true;
                            *active = ActiveProvider::Fallback;
                            *model = next.default_model().to_string();
                            chat_hooks.on_failover(session_id, provider, next.id(), class);
                            yield ChatEvent::SystemNotice(format!(
                                "{} failed ({}); switched to {}",
                                provider.display_name(),
                                class.summary().to_lowercase(),
                                next.id().display_name()
                            ));
                            continue;
                        }

                        tracker.set(TurnPhase::Failed);
                        let message = failure_message(class, &error);
                        chat_hooks.on_turn_failed(session_id, provider, class, &message);
                        drop(pending);
                        tracker.set(TurnPhase::Idle);
                        yield ChatEvent::Error {
                            kind: class,
                            message,
                        };
                        break;
                    }
                }
            }
        })
    }

    /// Removes the last User/Model pair. Returns `false` when the history
    /// does not end with one.
    pub fn undo_last_turn(&mut self) -> bool {
        self.history.undo_last_pair()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Toggles between primary and fallback, resetting the model to the
    /// newly active provider's default. History is kept. Returns `false`
    /// when no fallback is configured.
    pub fn switch_service(&mut self) -> bool {
        if self.fallback.is_none() {
            return false;
        }

        self.active = self.active.toggled();
        self.model = self.active_slot().default_model().to_string();
        true
    }

    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), ChatError> {
        let model = model.into();
        let model = model.trim();
        if model.is_empty() {
            return Err(ChatError::invalid_request("model must not be empty"));
        }

        let slot = self.active_slot();
        if !slot.models.is_empty() && !slot.models.iter().any(|known| known == model) {
            return Err(ChatError::invalid_request(format!(
                "{model} is not available for {}",
                slot.id().display_name()
            )));
        }

        self.model = model.to_string();
        Ok(())
    }

    /// Moves to the next model in the active provider's catalog.
    pub fn cycle_model(&mut self) -> &str {
        let slot = self.active_slot();
        let next = match slot.models.iter().position(|known| *known == self.model) {
            Some(index) => slot.models.get((index + 1) % slot.models.len()),
            None => slot.models.first(),
        }
        .cloned();

        if let Some(next) = next {
            self.model = next;
        }
        &self.model
    }

    /// Replaces the transcript with a previously saved one.
    pub fn restore_history(&mut self, turns: Vec<Turn>) -> Result<(), ChatError> {
        let evicted = self.history.restore(turns)?;
        if evicted > 0 {
            self.chat_hooks.on_history_evicted(&self.session_id, evicted);
        }
        Ok(())
    }

    pub fn history(&self) -> &[Turn] {
        self.history.turns()
    }

    pub fn turn_count(&self) -> usize {
        self.history.turn_count()
    }

    pub fn rate_stats(&self) -> RateStats {
        self.active_slot().rate_monitor.stats()
    }

    pub fn rate_stats_for(&self, which: ActiveProvider) -> Option<RateStats> {
        match which {
            ActiveProvider::Primary => Some(self.primary.rate_monitor.stats()),
            ActiveProvider::Fallback => self.fallback.as_ref().map(|slot| slot.rate_monitor.stats()),
        }
    }

    pub fn session_tokens(&self) -> u64 {
        self.session_tokens
    }

    pub fn active_provider(&self) -> ActiveProvider {
        self.active
    }

    pub fn active_provider_id(&self) -> ProviderId {
        self.active_slot().id()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn models(&self) -> &[String] {
        &self.active_slot().models
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Display label for the active service, e.g. `Zhipu GLM (fallback)`.
    pub fn service_name(&self) -> String {
        let name = self.active_slot().id().display_name();
        match self.active {
            ActiveProvider::Primary => name.to_string(),
            ActiveProvider::Fallback => format!("{name} (fallback)"),
        }
    }

    fn active_slot(&self) -> &ProviderSlot {
        match (self.active, &self.fallback) {
            (ActiveProvider::Fallback, Some(slot)) => slot,
            _ => &self.primary,
        }
    }
}

impl std::fmt::Debug for ChatOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOrchestrator")
            .field("session_id", &self.session_id)
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("active", &self.active)
            .field("model", &self.model)
            .field("turns", &self.history.turns().len())
            .field("phase", &self.phase)
            .finish()
    }
}

fn failure_message(class: FailureClass, error: &ProviderError) -> String {
    format!(
        "{}: {}",
        class.summary(),
        truncate_chars(&error.message, ERROR_DETAIL_CHARS)
    )
}

/// Reports phase transitions and returns to `Idle` when the turn ends,
/// including when its stream is dropped mid-flight.
struct PhaseTracker<'a> {
    phase: &'a mut TurnPhase,
    hooks: &'a dyn ChatHooks,
    session: &'a SessionId,
}

impl PhaseTracker<'_> {
    fn set(&mut self, next: TurnPhase) {
        let previous = *self.phase;
        if previous != next {
            *self.phase = next;
            self.hooks.on_phase_change(self.session, previous, next);
        }
    }
}

impl Drop for PhaseTracker<'_> {
    fn drop(&mut self) {
        self.set(TurnPhase::Idle);
    }
}
