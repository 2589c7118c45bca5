/// Emitted when the user asks to lock in a nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicknameSubmitted {
    pub candidate: String,
}

/// Emitted on every edit of the nickname field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NicknameEdited;

/// Emitted by the "Desloguear" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectRequested;

/// Emitted on every edit of the message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftChanged {
    pub text: String,
}

/// Emitted on Enter or the "Enviar" button. The draft itself lives in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSubmitted;
