use charla_session::SessionError;
use gpui::SharedString;

/// Validation messages shown under the nickname field and the message box.
///
/// Owned by the coordinator so a state change (logging out, locking a
/// nickname) clears every label it invalidates, not only the one next to the
/// control that was used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFeedback {
    nickname: Option<SharedString>,
    message: Option<SharedString>,
}

impl ValidationFeedback {
    pub fn nickname_error(&self) -> Option<SharedString> {
        self.nickname.clone()
    }

    pub fn message_error(&self) -> Option<SharedString> {
        self.message.clone()
    }

    pub fn nickname_rejected(&mut self, error: &SessionError) {
        self.nickname = Some(error.user_message().into());
    }

    pub fn message_rejected(&mut self, error: &SessionError) {
        self.message = Some(error.user_message().into());
    }

    /// A locked nickname resolves both "no nickname" complaints.
    pub fn nickname_locked(&mut self) {
        self.nickname = None;
        self.message = None;
    }

    pub fn nickname_edited(&mut self) {
        self.nickname = None;
    }

    pub fn draft_edited(&mut self) {
        self.message = None;
    }

    pub fn message_sent(&mut self) {
        self.message = None;
    }

    pub fn logged_out(&mut self) {
        self.nickname = None;
        self.message = None;
    }
}
