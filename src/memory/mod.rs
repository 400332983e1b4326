
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// One completed question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Append-only log of prior question/answer turns
///
/// Held in process memory only; reset by restart. Appends are mutually
/// exclusive and `as_context` returns a consistent snapshot, so concurrent
/// readers never observe a partially written turn.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Mutex<Vec<Turn>>,
}

impl ConversationMemory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed exchange
    #[inline]
    pub fn append(&self, question: &str, answer: &str) {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        turns.push(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
        });
    }

    /// Snapshot of all prior turns in order
    #[inline]
    pub fn as_context(&self) -> Vec<Turn> {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
