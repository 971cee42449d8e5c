//! Conversation turns and the append-only buffer persisted as the interview transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One spoken turn (who, what, when).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_final: bool,
}

impl ConversationEntry {
    /// A final turn stamped now.
    pub fn final_now(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
            is_final: true,
        }
    }
}

/// Append-only ordered log of spoken turns. Entries are never reordered or mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationBuffer {
    entries: Vec<ConversationEntry>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `role: text` lines, used as the conversation context in backend prompts.
    pub fn to_plain_text(&self) -> String {
        render_plain_text(&self.entries)
    }

    pub fn to_vec(&self) -> Vec<ConversationEntry> {
        self.entries.clone()
    }
}

pub fn render_plain_text(entries: &[ConversationEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}: {}", e.role.as_str(), e.text))
        .collect::<Vec<_>>()
        .join("\n")
}
