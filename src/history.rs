//! Conversation history
//!
//! An append-only, strictly alternating log of user and assistant turns.
//! The full history is retained for display/export; only a bounded window
//! of recent turns is rendered into the backend prompt.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Speaker role for a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user (transcribed speech)
    User,
    /// Model response
    Assistant,
    /// System instruction
    System,
}

impl Role {
    /// Prompt label for this role
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }
}

/// One utterance in the conversation
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    /// Who spoke
    pub role: Role,
    /// What was said (already sanitized for storage)
    pub content: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation log with a bounded prompt window
#[derive(Debug, Clone)]
pub struct History {
    turns: Vec<Turn>,
    window: usize,
}

impl History {
    /// Create an empty history whose prompt window holds the last
    /// `window` turns
    #[must_use]
    pub const fn new(window: usize) -> Self {
        Self {
            turns: Vec::new(),
            window,
        }
    }

    /// Append a user turn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversation`] when the previous non-system turn
    /// was also a user turn; turn-taking must strictly alternate.
    pub fn push_user(&mut self, content: impl Into<String>) -> Result<()> {
        self.push(Turn::new(Role::User, content))
    }

    /// Append an assistant turn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversation`] when the previous non-system turn
    /// was also an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> Result<()> {
        self.push(Turn::new(Role::Assistant, content))
    }

    /// Append a system turn (never subject to alternation)
    pub fn push_system(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::System, content));
    }

    fn push(&mut self, turn: Turn) -> Result<()> {
        let last = self.turns.iter().rev().find(|t| t.role != Role::System);
        if last.is_some_and(|t| t.role == turn.role) {
            return Err(Error::Conversation(format!(
                "consecutive {} turns",
                turn.role.label().to_lowercase()
            )));
        }
        self.turns.push(turn);
        Ok(())
    }

    /// All recorded turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turns that fit the prompt window
    #[must_use]
    pub fn window(&self) -> &[Turn] {
        let start = self.turns.len().saturating_sub(self.window);
        &self.turns[start..]
    }

    /// Render the prompt window as labeled transcript lines
    #[must_use]
    pub fn prompt_window(&self) -> String {
        self.window()
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of recorded turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns have been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop all turns (session reset)
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
