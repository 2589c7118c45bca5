use std::path::PathBuf;

use gpui::*;
use gpui_component::{ActiveTheme, h_flex, label::Label, v_flex};

use crate::chat::{ChatView, ConnectionStatus};
use crate::settings::ChatSettings;

pub const APP_TITLE: &str = "Charla";

/// Themes are looked up relative to the working directory.
pub fn default_themes_path() -> PathBuf {
    PathBuf::from("./themes")
}

gpui::actions!(shell, [Quit]);

/// Who the header says is chatting.
pub fn identity_label(nickname: &str) -> SharedString {
    if nickname.is_empty() {
        "Sin nickname".into()
    } else {
        format!("Chateando como {nickname}").into()
    }
}

/// Window root: a status header above the chat view.
///
/// The platform title bar is used as is; the shell only re-renders when the
/// chat view notifies so the header follows connection and nickname changes.
pub struct ChatAppShell {
    chat_view: Entity<ChatView>,
}

impl ChatAppShell {
    pub fn new(settings: ChatSettings, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let chat_view = cx.new(|cx| ChatView::new(&settings, window, cx));
        cx.observe(&chat_view, |_, _, cx| cx.notify()).detach();

        Self { chat_view }
    }

    fn render_header(&self, cx: &Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let chat_view = self.chat_view.read(cx);
        let status = chat_view.connection_status();
        let status_color = match status {
            ConnectionStatus::Connected => theme.success,
            ConnectionStatus::Connecting => theme.warning,
            ConnectionStatus::Disconnected(_) => theme.danger,
        };

        h_flex()
            .id("chat-header")
            .w_full()
            .flex_shrink_0()
            .px_3()
            .py_2()
            .gap_3()
            .items_center()
            .justify_between()
            .border_b_1()
            .border_color(theme.border)
            .child(
                Label::new(identity_label(chat_view.nickname()))
                    .text_sm()
                    .text_color(theme.foreground),
            )
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(div().size(px(8.)).rounded_full().bg(status_color))
                    .child(
                        Label::new(status.label())
                            .text_xs()
                            .text_color(theme.muted_foreground),
                    ),
            )
    }
}

impl Render for ChatAppShell {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("app-shell")
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(self.render_header(cx))
            .child(
                div()
                    .id("app-shell-body")
                    .flex_1()
                    .min_h_0()
                    .child(self.chat_view.clone()),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_the_locked_nickname() {
        assert_eq!(identity_label("").to_string(), "Sin nickname");
        assert_eq!(identity_label("ana").to_string(), "Chateando como ana");
    }
}
