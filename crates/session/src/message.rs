use serde::{Deserialize, Serialize};

/// One chat entry, either received live or fetched from history.
///
/// The history backend names the text field `message` on the wire; that
/// shape is converted at the history client boundary so both sequences share
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub body: String,
}

impl ChatMessage {
    pub fn new(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
        }
    }

    /// Returns true when the message was sent by `nickname`.
    ///
    /// An empty nickname never owns anything, so anonymous sessions render
    /// every line as foreign.
    pub fn is_from(&self, nickname: &str) -> bool {
        !nickname.is_empty() && self.from == nickname
    }
}
