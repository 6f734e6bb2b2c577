//! Bounded conversation transcript with transactional turn appends.
//!
//! A turn is opened with [`ConversationState::begin_turn`], which appends the
//! user turn and returns a [`PendingTurn`] guard. Committing the guard
//! appends the model reply; dropping it uncommitted removes the user turn
//! again, so a failed or cancelled turn leaves no orphan behind.
//!
//! ```rust
//! use dchat::ConversationState;
//!
//! let mut state = ConversationState::new(40);
//! state.begin_turn("hello").commit("hi there");
//! assert_eq!(state.turn_count(), 1);
//!
//! drop(state.begin_turn("this one fails"));
//! assert_eq!(state.turns().len(), 2);
//! ```

use dcommon::estimate_tokens;
use dprovider::{Role, Turn};

use crate::ChatError;

pub const DEFAULT_MAX_HISTORY_TURNS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_TURNS)
    }
}

impl ConversationState {
    /// `max_turns` is rounded up to an even number of at least two so the
    /// retained window always holds whole pairs.
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(2);
        Self {
            turns: Vec::new(),
            max_turns: max_turns + max_turns % 2,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Completed User/Model pairs.
    pub fn turn_count(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn estimated_tokens(&self) -> u64 {
        self.turns
            .iter()
            .map(|turn| estimate_tokens(&turn.text) as u64)
            .sum()
    }

    pub fn begin_turn(&mut self, user_text: impl Into<String>) -> PendingTurn<'_> {
        self.turns.push(Turn::user(user_text));
        PendingTurn {
            state: self,
            committed: false,
        }
    }

    /// Removes a trailing User/Model pair. Any other ending is left alone.
    pub fn undo_last_pair(&mut self) -> bool {
        let len = self.turns.len();
        if len < 2 {
            return false;
        }

        let ends_with_pair =
            self.turns[len - 2].role == Role::User && self.turns[len - 1].role == Role::Model;
        if !ends_with_pair {
            return false;
        }

        self.turns.truncate(len - 2);
        true
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Replaces the transcript with `turns`, which must alternate starting
    /// with a user turn and end on a model turn. Oversized transcripts keep
    /// their most recent pairs.
    pub fn restore(&mut self, turns: Vec<Turn>) -> Result<usize, ChatError> {
        if turns.len() % 2 != 0 {
            return Err(ChatError::history(
                "restored history must end with a model turn",
            ));
        }

        let alternates = turns.iter().enumerate().all(|(index, turn)| {
            let expected = if index % 2 == 0 { Role::User } else { Role::Model };
            turn.role == expected
        });
        if !alternates {
            return Err(ChatError::history(
                "restored history must alternate user and model turns",
            ));
        }

        self.turns = turns;
        Ok(self.evict_overflow())
    }

    fn evict_overflow(&mut self) -> usize {
        let overflow = self.turns.len().saturating_sub(self.max_turns);
        let evicted = overflow + overflow % 2;
        if evicted > 0 {
            self.turns.drain(..evicted);
        }
        evicted
    }
}

/// An open turn whose user message is already in the transcript.
#[must_use = "dropping a pending turn retracts its user message"]
#[derive(Debug)]
pub struct PendingTurn<'a> {
    state: &'a mut ConversationState,
    committed: bool,
}

impl PendingTurn<'_> {
    /// The transcript before this turn's user message.
    pub fn prior_turns(&self) -> &[Turn] {
        let len = self.state.turns.len();
        &self.state.turns[..len - 1]
    }

    pub fn user_text(&self) -> &str {
        self.state
            .turns
            .last()
            .map(|turn| turn.text.as_str())
            .unwrap_or_default()
    }

    /// Appends the model reply and trims the oldest pairs past the cap.
    /// Returns how many turns were evicted.
    pub fn commit(mut self, model_text: impl Into<String>) -> usize {
        self.committed = true;
        self.state.turns.push(Turn::model(model_text));
        self.state.evict_overflow()
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.turns.pop();
        }
    }
}
