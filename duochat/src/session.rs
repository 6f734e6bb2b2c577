//! Runs turns on a background task and hands events back over a channel.

use std::sync::Arc;

use dchat::{ChatEvent, ChatOrchestrator};
use futures_util::StreamExt;
use tokio::sync::{Mutex, MutexGuard, mpsc};

const EVENT_BUFFER: usize = 64;

/// Shared handle to one conversation.
///
/// [`ChatSessionHandle::submit`] takes the conversation lock before it spawns
/// the turn, so turns start in the order their `submit` calls resolve and
/// never overlap. Dropping the receiver returned by
/// [`ChatSessionHandle::submit`] cancels that turn.
#[derive(Clone)]
pub struct ChatSessionHandle {
    orchestrator: Arc<Mutex<ChatOrchestrator>>,
}

impl ChatSessionHandle {
    pub fn new(orchestrator: ChatOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(Mutex::new(orchestrator)),
        }
    }

    /// Waits for any running turn to finish, then spawns this one on the
    /// current tokio runtime.
    pub async fn submit(&self, text: impl Into<String>) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let mut orchestrator = Arc::clone(&self.orchestrator).lock_owned().await;
        let text = text.into();

        tokio::spawn(async move {
            let mut events = orchestrator.send_turn(text);

            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        tracing::debug!("turn receiver dropped; cancelling turn");
                        break;
                    }
                    event = events.next() => match event {
                        Some(event) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        rx
    }

    /// Locks the conversation for commands and queries. Waits for any
    /// running turn to finish first.
    pub async fn lock(&self) -> MutexGuard<'_, ChatOrchestrator> {
        self.orchestrator.lock().await
    }
}

impl std::fmt::Debug for ChatSessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSessionHandle").finish_non_exhaustive()
    }
}
