//! Session transcript
//!
//! Append-only, insertion-ordered log of user and assistant turns. There is
//! no edit or delete; the consuming UI scrolls to the latest entry whenever
//! the log grows.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing
    User,
    /// The model (or a placeholder standing in for its answer)
    Assistant,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "User"),
            Sender::Assistant => write!(f, "Assistant"),
        }
    }
}

/// One transcript entry; immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: Sender,
    text: String,
}

impl Message {
    /// Who sent it
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Message body
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Ordered log of messages
///
/// # Examples
///
/// ```
/// use atchat::transcript::{Sender, Transcript};
///
/// let mut transcript = Transcript::new();
/// transcript.append_user("a");
/// transcript.append_assistant("b");
/// assert_eq!(transcript.len(), 2);
/// assert_eq!(transcript.last().unwrap().sender(), Sender::Assistant);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn
    pub fn append_user(&mut self, text: impl Into<String>) -> &Message {
        self.push(Sender::User, text.into())
    }

    /// Append an assistant turn
    pub fn append_assistant(&mut self, text: impl Into<String>) -> &Message {
        self.push(Sender::Assistant, text.into())
    }

    fn push(&mut self, sender: Sender, text: String) -> &Message {
        tracing::debug!(%sender, chars = text.len(), "Appending transcript message");
        self.messages.push(Message { sender, text });
        &self.messages[self.messages.len() - 1]
    }

    /// All messages in insertion order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been said yet
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
