use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    input::{Input, InputEvent, InputState},
    label::Label,
    v_flex,
};

use crate::chat::events::{DraftChanged, MessageSubmitted};

pub const MESSAGE_PLACEHOLDER: &str = "Escribí tu mensaje...";
pub const SEND_LABEL: &str = "Enviar";

/// Message box plus the "is typing" line of other participants.
///
/// The draft is owned by the session; this view only forwards edits and
/// submit requests.
pub struct MessageInput {
    input_state: Entity<InputState>,
    typing_indicator: Option<SharedString>,
    error: Option<SharedString>,
}

impl EventEmitter<DraftChanged> for MessageInput {}
impl EventEmitter<MessageSubmitted> for MessageInput {}

impl MessageInput {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state = cx.new(|cx| {
            InputState::new(window, cx)
                .placeholder(MESSAGE_PLACEHOLDER)
                .clean_on_escape()
        });

        cx.subscribe_in(
            &input_state,
            window,
            |_, state, event: &InputEvent, _window, cx| match event {
                InputEvent::Change => {
                    let text = state.read(cx).value().to_string();
                    cx.emit(DraftChanged { text });
                }
                InputEvent::PressEnter { .. } => cx.emit(MessageSubmitted),
                _ => {}
            },
        )
        .detach();

        Self {
            input_state,
            typing_indicator: None,
            error: None,
        }
    }

    pub fn set_typing_indicator(&mut self, indicator: Option<String>, cx: &mut Context<Self>) {
        let indicator = indicator.map(SharedString::from);
        if self.typing_indicator != indicator {
            self.typing_indicator = indicator;
            cx.notify();
        }
    }

    pub fn set_error(&mut self, error: Option<SharedString>, cx: &mut Context<Self>) {
        if self.error != error {
            self.error = error;
            cx.notify();
        }
    }

    pub fn clear(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
    }
}

impl Render for MessageInput {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .bg(theme.background)
            .gap_2()
            .p_3()
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .rounded_lg()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.background)
                    .child(Input::new(&self.input_state).w_full()),
            )
            .when_some(self.typing_indicator.clone(), |column, indicator| {
                column.child(
                    Label::new(indicator)
                        .text_xs()
                        .text_color(theme.foreground.opacity(0.65)),
                )
            })
            .when_some(self.error.clone(), |column, error| {
                column.child(div().text_sm().text_color(theme.danger).child(error))
            })
            .child(
                div().w_full().flex().justify_end().child(
                    Button::new("send")
                        .small()
                        .primary()
                        .icon(IconName::ArrowUp)
                        .child(SEND_LABEL)
                        .on_click(cx.listener(|_, _, _window, cx| {
                            cx.emit(MessageSubmitted);
                        })),
                ),
            )
    }
}
