use charla_session::ChatMessage;
use serde::{Deserialize, Serialize};

/// Message as stored by the history backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub message: String,
}

impl From<StoredMessage> for ChatMessage {
    fn from(stored: StoredMessage) -> Self {
        ChatMessage::new(stored.from, stored.message)
    }
}

/// Body of `GET <base>/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Body of `POST <base>/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRequest {
    pub message: String,
    pub from: String,
}

impl From<ChatMessage> for SaveRequest {
    fn from(message: ChatMessage) -> Self {
        Self {
            message: message.body,
            from: message.from,
        }
    }
}
