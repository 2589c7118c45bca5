use snafu::ensure;

use crate::color::{Color, ColorAssignment, OWN_MESSAGE_COLOR};
use crate::command::{Command, OutboundEvent};
use crate::error::{
    EmptyNicknameSnafu, MissingNicknameSnafu, NicknameLockedSnafu, SessionEndedSnafu,
    SessionResult,
};
use crate::message::ChatMessage;
use crate::render::{ChatLine, Section};
use crate::typing::TypingStatus;

/// Identity lifecycle of the local user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Locked { nickname: String },
}

impl SessionState {
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Locked { nickname } => Some(nickname),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// Chat state reconciled from user actions, transport events and the
/// one-shot history fetch.
///
/// All mutation happens through the methods below, one event at a time.
/// Methods never perform IO; they return the [`Command`]s the host must run.
#[derive(Debug, Default)]
pub struct ChatSession {
    state: SessionState,
    draft: String,
    self_typing: bool,
    typing: TypingStatus,
    live: Vec<ChatMessage>,
    history: Vec<ChatMessage>,
    colors: ColorAssignment,
    history_requested: bool,
    ended: bool,
}

impl ChatSession {
    pub fn new(colors: ColorAssignment) -> Self {
        Self {
            colors,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current nickname, empty while anonymous.
    pub fn nickname(&self) -> &str {
        self.state.nickname().unwrap_or_default()
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_self_typing(&self) -> bool {
        self.self_typing
    }

    pub fn typing_status(&self) -> &TypingStatus {
        &self.typing
    }

    pub fn live_messages(&self) -> &[ChatMessage] {
        &self.live
    }

    pub fn history_messages(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn submit_nickname(&mut self, candidate: &str) -> SessionResult<Vec<Command>> {
        ensure!(!self.ended, SessionEndedSnafu);
        if let SessionState::Locked { nickname } = &self.state {
            return NicknameLockedSnafu {
                nickname: nickname.clone(),
            }
            .fail();
        }

        ensure!(!candidate.is_empty(), EmptyNicknameSnafu);

        self.state = SessionState::Locked {
            nickname: candidate.to_string(),
        };
        tracing::info!(nickname = %candidate, "nickname set");

        Ok(vec![Command::Emit(OutboundEvent::Nickname(
            candidate.to_string(),
        ))])
    }

    /// Clears the nickname locally. No departure event is sent.
    pub fn disconnect(&mut self) {
        if let SessionState::Locked { nickname } = &self.state {
            tracing::info!(nickname = %nickname, "nickname cleared");
        }
        self.state = SessionState::Anonymous;
    }

    /// Stores the draft and announces own typing transitions.
    ///
    /// The local keystroke also writes the shared typing flag, so a remote
    /// typist stays remembered by name but is hidden while the local user
    /// types.
    pub fn update_draft(&mut self, text: impl Into<String>) -> Vec<Command> {
        if self.ended {
            return Vec::new();
        }

        let text = text.into();
        let is_typing = !text.is_empty();
        self.draft = text;
        self.typing.is_typing = is_typing;

        if is_typing == self.self_typing {
            return Vec::new();
        }

        self.self_typing = is_typing;
        vec![Command::Emit(OutboundEvent::Typing(TypingStatus::new(
            is_typing,
            self.nickname(),
        )))]
    }

    pub fn submit_message(&mut self) -> SessionResult<Vec<Command>> {
        ensure!(!self.ended, SessionEndedSnafu);
        let Some(nickname) = self.state.nickname().map(str::to_string) else {
            tracing::debug!("message rejected: no nickname set");
            return MissingNicknameSnafu.fail();
        };

        let message = ChatMessage::new(nickname.clone(), std::mem::take(&mut self.draft));
        let mut commands = vec![Command::Emit(OutboundEvent::Message {
            body: message.body.clone(),
            from: nickname.clone(),
        })];

        if self.self_typing {
            self.self_typing = false;
            commands.push(Command::Emit(OutboundEvent::Typing(TypingStatus::new(
                false, nickname,
            ))));
        }
        self.typing.is_typing = false;

        self.live.push(message.clone());
        commands.push(Command::Persist(message));
        commands.push(Command::ScrollToLatest);
        Ok(commands)
    }

    pub fn on_inbound_message(&mut self, message: ChatMessage) -> Vec<Command> {
        if self.ended {
            tracing::debug!(from = %message.from, "dropping message received after teardown");
            return Vec::new();
        }

        self.live.push(message);
        vec![Command::ScrollToLatest]
    }

    /// Replaces the shared typing status (last write wins).
    pub fn on_inbound_typing(&mut self, status: TypingStatus) {
        if self.ended {
            return;
        }
        self.typing = status;
    }

    /// Requests the history fetch the first time only.
    pub fn load_history(&mut self) -> Option<Command> {
        if self.ended || self.history_requested {
            return None;
        }

        self.history_requested = true;
        Some(Command::FetchHistory)
    }

    pub fn history_loaded(&mut self, messages: Vec<ChatMessage>) -> Vec<Command> {
        if self.ended {
            tracing::debug!("dropping history received after teardown");
            return Vec::new();
        }

        tracing::debug!(count = messages.len(), "history loaded");
        self.history = messages;
        vec![Command::ScrollToLatest]
    }

    /// Ends the session; later callbacks leave state untouched.
    pub fn teardown(&mut self) {
        self.ended = true;
    }

    pub fn color_for(&mut self, nickname: &str) -> Color {
        self.colors.color_for(nickname)
    }

    /// Indicator text, present only while someone else is shown typing.
    pub fn typing_indicator(&self) -> Option<String> {
        if self.typing.is_typing && !self.self_typing {
            Some(self.typing.indicator_text())
        } else {
            None
        }
    }

    /// Live lines in receipt order followed by history lines in fetch order.
    pub fn lines(&mut self) -> Vec<ChatLine> {
        let nickname = self.nickname().to_string();
        let mut lines = Vec::with_capacity(self.live.len() + self.history.len());

        let live = self.live.iter().map(|message| (Section::Live, message));
        let history = self.history.iter().map(|message| (Section::History, message));
        for (section, message) in live.chain(history) {
            let own = message.is_from(&nickname);
            let background = if own {
                OWN_MESSAGE_COLOR
            } else {
                self.colors.color_for(&message.from)
            };

            lines.push(ChatLine {
                section,
                from: message.from.clone(),
                body: message.body.clone(),
                background,
                own,
                muted: section == Section::History && !own,
            });
        }

        lines
    }
}
