use snafu::Snafu;

/// Local validation failures surfaced to the user at the point of action.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("nickname must not be empty"))]
    EmptyNickname,
    #[snafu(display("nickname is already set to '{nickname}'"))]
    NicknameLocked { nickname: String },
    #[snafu(display("cannot send a message without a nickname"))]
    MissingNickname,
    #[snafu(display("chat session has ended"))]
    SessionEnded,
}

impl SessionError {
    /// Text shown to the user next to the control that was used.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyNickname => "Escribí un nickname antes de establecerlo",
            Self::NicknameLocked { .. } => "Ya tenés un nickname, deslogueate para cambiarlo",
            Self::MissingNickname => {
                "Si no te logeas con un nickname, no vas a poder mandar mensajes"
            }
            Self::SessionEnded => "La sesión de chat terminó",
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
