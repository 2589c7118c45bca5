use serde::{Deserialize, Serialize};

/// Name shown when a typing notification carries no user.
pub const TYPING_PLACEHOLDER_USER: &str = "Alguien";

/// Last known "someone is typing" state.
///
/// Only one typist is remembered. Every update replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStatus {
    #[serde(default)]
    pub is_typing: bool,
    #[serde(default)]
    pub user: String,
}

impl TypingStatus {
    pub fn new(is_typing: bool, user: impl Into<String>) -> Self {
        Self {
            is_typing,
            user: user.into(),
        }
    }

    /// Display name for the indicator, falling back to a generic name.
    pub fn display_user(&self) -> &str {
        let user = self.user.trim();
        if user.is_empty() {
            TYPING_PLACEHOLDER_USER
        } else {
            user
        }
    }

    pub fn indicator_text(&self) -> String {
        format!("{} está escribiendo...", self.display_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_uses_camel_case() {
        let status: TypingStatus =
            serde_json::from_str(r#"{"isTyping":true,"user":"bob"}"#).unwrap();
        assert_eq!(status, TypingStatus::new(true, "bob"));

        let json = serde_json::to_value(TypingStatus::new(false, "ana")).unwrap();
        assert_eq!(json, serde_json::json!({"isTyping": false, "user": "ana"}));
    }

    #[test]
    fn blank_user_falls_back_to_placeholder() {
        assert_eq!(
            TypingStatus::new(true, "  ").indicator_text(),
            "Alguien está escribiendo..."
        );
        assert_eq!(
            TypingStatus::new(true, "bob").indicator_text(),
            "bob está escribiendo..."
        );
    }

    #[test]
    fn missing_fields_default() {
        let status: TypingStatus = serde_json::from_str(r#"{"isTyping":true}"#).unwrap();
        assert!(status.is_typing);
        assert_eq!(status.user, "");
    }
}
