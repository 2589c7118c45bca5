use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::{
    ActiveTheme, IconName, Sizable,
    button::{Button, ButtonVariants},
    h_flex,
    input::{Input, InputEvent, InputState},
    v_flex,
};

use crate::chat::events::{DisconnectRequested, NicknameEdited, NicknameSubmitted};

pub const NICKNAME_PLACEHOLDER: &str = "¡Escribí tu nickname deseado acá!";
pub const SUBMIT_NICKNAME_LABEL: &str = "Establecer";
pub const DISCONNECT_LABEL: &str = "Desloguear";

/// Nickname entry. The field and "Establecer" are disabled while a nickname is locked.
pub struct NicknameForm {
    input_state: Entity<InputState>,
    locked: bool,
    error: Option<SharedString>,
}

impl EventEmitter<NicknameSubmitted> for NicknameForm {}
impl EventEmitter<DisconnectRequested> for NicknameForm {}
impl EventEmitter<NicknameEdited> for NicknameForm {}

impl NicknameForm {
    pub fn new(window: &mut Window, cx: &mut Context<Self>) -> Self {
        let input_state =
            cx.new(|cx| InputState::new(window, cx).placeholder(NICKNAME_PLACEHOLDER));

        cx.subscribe_in(
            &input_state,
            window,
            |this, _, event: &InputEvent, _window, cx| match event {
                InputEvent::PressEnter { .. } => this.submit(cx),
                InputEvent::Change => cx.emit(NicknameEdited),
                _ => {}
            },
        )
        .detach();

        Self {
            input_state,
            locked: false,
            error: None,
        }
    }

    pub fn set_locked(&mut self, locked: bool, cx: &mut Context<Self>) {
        self.locked = locked;
        cx.notify();
    }

    pub fn set_error(&mut self, error: Option<SharedString>, cx: &mut Context<Self>) {
        if self.error != error {
            self.error = error;
            cx.notify();
        }
    }

    fn submit(&mut self, cx: &mut Context<Self>) {
        if self.locked {
            return;
        }

        let candidate = self.input_state.read(cx).value().to_string();
        cx.emit(NicknameSubmitted { candidate });
    }

    fn disconnect(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        self.input_state.update(cx, |state, cx| {
            state.set_value("", window, cx);
        });
        cx.emit(DisconnectRequested);
    }
}

impl Render for NicknameForm {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let locked = self.locked;

        v_flex()
            .gap_2()
            .p_3()
            .child(
                h_flex()
                    .w_full()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .flex_1()
                            .min_w_0()
                            .child(Input::new(&self.input_state).w_full().disabled(locked)),
                    )
                    .child(
                        Button::new("nickname-disconnect")
                            .small()
                            .ghost()
                            .icon(IconName::CircleX)
                            .child(DISCONNECT_LABEL)
                            .on_click(cx.listener(|this, _, window, cx| {
                                this.disconnect(window, cx);
                            })),
                    )
                    .child(
                        Button::new("nickname-submit")
                            .small()
                            .primary()
                            .child(SUBMIT_NICKNAME_LABEL)
                            .disabled(locked)
                            .on_click(cx.listener(|this, _, _window, cx| {
                                this.submit(cx);
                            })),
                    ),
            )
            .when_some(self.error.clone(), |form, error| {
                form.child(div().text_sm().text_color(theme.danger).child(error))
            })
    }
}
