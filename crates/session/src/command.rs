use crate::message::ChatMessage;
use crate::typing::TypingStatus;

/// Event announced to other sessions over the realtime transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    Nickname(String),
    Message { body: String, from: String },
    Typing(TypingStatus),
}

impl OutboundEvent {
    /// Transport event name this payload is sent under.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nickname(_) => "nickname",
            Self::Message { .. } => "message",
            Self::Typing(_) => "typing",
        }
    }
}

/// Side effect requested by a session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send an event on the realtime transport.
    Emit(OutboundEvent),
    /// Fire-and-forget durability write to the history service.
    Persist(ChatMessage),
    /// One-shot history fetch; feed the result to `history_loaded`.
    FetchHistory,
    ScrollToLatest,
}
