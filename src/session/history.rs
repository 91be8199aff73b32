//! Conversation turns and the bounded rolling history built from them.

use serde::{Deserialize, Serialize};

/// Maximum number of raw turns kept after a trim.
///
/// This counts entries, not exchanges: ten turns is at most five user/assistant pairs.
pub const HISTORY_LIMIT: usize = 10;

/// Who produced a turn.
///
/// The system instruction sent to the language model is deliberately not a variant:
/// it is added on the wire by the reply generator and can never be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat completion APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered list of turns; index order is chronological order.
///
/// Turns are only ever appended. Trimming never edits in place, it produces a new
/// `History` holding the most recent entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Copy of the last `limit` turns, oldest discarded first.
    pub fn trimmed(&self, limit: usize) -> History {
        let start = self.turns.len().saturating_sub(limit);
        History {
            turns: self.turns[start..].to_vec(),
        }
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}
