use gavel_shared::{ChatMessage, UserId};

use super::Outcome;

/// A chat line with its client-side ownership flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub message: ChatMessage,
    pub is_own: bool,
}

/// Order chat, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatLog {
    viewer: Option<UserId>,
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn new(viewer: Option<UserId>, history: Vec<ChatMessage>) -> Self {
        let mut log = Self {
            viewer,
            entries: Vec::with_capacity(history.len()),
        };
        for message in history {
            log.apply_message(message);
        }
        log
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Append a message unless one with the same id is already shown (our
    /// own optimistic copy, typically).
    pub fn apply_message(&mut self, message: ChatMessage) -> Outcome {
        if self.entries.iter().any(|e| e.message.id == message.id) {
            return Outcome::Ignored("duplicate message");
        }
        let is_own = self.viewer == Some(message.sender_id);
        self.entries.push(ChatEntry { message, is_own });
        Outcome::Appended
    }

    /// Recompute ownership after the signed-in user changes.
    pub fn set_viewer(&mut self, viewer: Option<UserId>) -> bool {
        if self.viewer == viewer {
            return false;
        }
        self.viewer = viewer;
        for entry in &mut self.entries {
            entry.is_own = viewer == Some(entry.message.sender_id);
        }
        true
    }
}
