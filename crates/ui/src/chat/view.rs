use std::future::Future;
use std::sync::Arc;

use charla_history::{HistoryService, create_history_service};
use charla_session::{
    ChatMessage, ChatSession, ColorAssignment, Command, OutboundEvent, TypingStatus,
};
use charla_transport::{
    TransportEvent, TransportHandle, TransportSender, TransportSubscription, TransportWorker,
    create_transport,
};
use gpui::*;
use gpui_component::{ActiveTheme, v_flex};
use gpui_tokio_bridge::Tokio;

use crate::chat::events::{
    DisconnectRequested, DraftChanged, MessageSubmitted, NicknameEdited, NicknameSubmitted,
};
use crate::chat::{MessageInput, MessageList, NicknameForm, ValidationFeedback};
use crate::settings::ChatSettings;

/// Realtime connection state shown in the title bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected(String),
}

impl ConnectionStatus {
    pub fn label(&self) -> SharedString {
        match self {
            Self::Connecting => "Conectando...".into(),
            Self::Connected => "Conectado".into(),
            Self::Disconnected(reason) => format!("Desconectado: {reason}").into(),
        }
    }
}

/// Parent coordinator: owns the session and executes the commands it returns
/// against the realtime transport and the history service.
pub struct ChatView {
    nickname_form: Entity<NicknameForm>,
    message_list: Entity<MessageList>,
    message_input: Entity<MessageInput>,
    session: ChatSession,
    feedback: ValidationFeedback,
    transport: Option<TransportSender>,
    history: Option<Arc<dyn HistoryService>>,
    connection_status: ConnectionStatus,
    transport_worker_task: Option<Task<Result<(), gpui_tokio_bridge::JoinError>>>,
    transport_reader_task: Option<Task<()>>,
    history_task: Option<Task<()>>,
}

impl ChatView {
    pub fn new(settings: &ChatSettings, window: &mut Window, cx: &mut Context<Self>) -> Self {
        let nickname_form = cx.new(|cx| NicknameForm::new(window, cx));
        let message_list = cx.new(MessageList::new);
        let message_input = cx.new(|cx| MessageInput::new(window, cx));

        let history = match create_history_service(settings.history_config()) {
            Ok(service) => Some(service),
            Err(error) => {
                tracing::warn!(error = %error, "history service unavailable");
                None
            }
        };

        let mut this = Self {
            nickname_form: nickname_form.clone(),
            message_list,
            message_input: message_input.clone(),
            session: ChatSession::new(ColorAssignment::default()),
            feedback: ValidationFeedback::default(),
            transport: None,
            history,
            connection_status: ConnectionStatus::Connecting,
            transport_worker_task: None,
            transport_reader_task: None,
            history_task: None,
        };

        match create_transport(settings.transport_config()).and_then(|transport| {
            tracing::info!(endpoint = transport.endpoint(), "connecting realtime transport");
            transport.connect()
        }) {
            Ok(handle) => this.spawn_transport_pipeline(handle, cx),
            Err(error) => {
                tracing::warn!(error = %error, "realtime transport unavailable");
                this.connection_status = ConnectionStatus::Disconnected(error.to_string());
            }
        }

        cx.subscribe(&nickname_form, |this, _, event: &NicknameSubmitted, cx| {
            this.handle_nickname_submitted(event, cx);
        })
        .detach();

        cx.subscribe(&nickname_form, |this, _, _event: &NicknameEdited, cx| {
            this.feedback.nickname_edited();
            this.sync_feedback(cx);
        })
        .detach();

        cx.subscribe(&nickname_form, |this, _, _event: &DisconnectRequested, cx| {
            this.handle_disconnect(cx);
        })
        .detach();

        cx.subscribe(&message_input, |this, _, event: &DraftChanged, cx| {
            this.handle_draft_changed(event, cx);
        })
        .detach();

        cx.subscribe_in(
            &message_input,
            window,
            |this, _, _event: &MessageSubmitted, window, cx| {
                this.handle_message_submitted(window, cx);
            },
        )
        .detach();

        cx.on_release(|this, _cx| this.teardown()).detach();

        if let Some(command) = this.session.load_history() {
            this.run_commands(vec![command], cx);
        }

        this
    }

    /// Locked nickname, empty while anonymous.
    pub fn nickname(&self) -> &str {
        self.session.nickname()
    }

    pub fn connection_status(&self) -> &ConnectionStatus {
        &self.connection_status
    }

    fn spawn_transport_pipeline(&mut self, handle: TransportHandle, cx: &mut Context<Self>) {
        self.transport = Some(handle.sender);
        self.spawn_transport_worker(handle.worker, cx);
        self.spawn_transport_reader(handle.subscription, cx);
    }

    fn spawn_transport_worker(&mut self, worker: TransportWorker, cx: &mut Context<Self>) {
        self.transport_worker_task = Some(Tokio::spawn(cx, worker));
    }

    fn spawn_transport_reader(
        &mut self,
        mut subscription: TransportSubscription,
        cx: &mut Context<Self>,
    ) {
        self.transport_reader_task = Some(cx.spawn(async move |this, cx| {
            while let Some(event) = subscription.recv().await {
                let _ = this.update(cx, |this, cx| {
                    this.handle_transport_event(event, cx);
                });
            }
        }));
    }

    fn handle_transport_event(&mut self, event: TransportEvent, cx: &mut Context<Self>) {
        match event {
            TransportEvent::Connected => {
                tracing::info!("realtime transport connected");
                self.connection_status = ConnectionStatus::Connected;
                cx.notify();
            }
            TransportEvent::Message(message) => self.handle_inbound_message(message, cx),
            TransportEvent::Typing(status) => self.handle_inbound_typing(status, cx),
            TransportEvent::Disconnected { reason } => {
                tracing::warn!(reason = %reason, "realtime transport disconnected");
                self.connection_status = ConnectionStatus::Disconnected(reason);
                cx.notify();
            }
        }
    }

    fn handle_inbound_message(&mut self, message: ChatMessage, cx: &mut Context<Self>) {
        let commands = self.session.on_inbound_message(message);
        self.run_commands(commands, cx);
    }

    fn handle_inbound_typing(&mut self, status: TypingStatus, cx: &mut Context<Self>) {
        self.session.on_inbound_typing(status);
        self.sync_children(cx);
    }

    fn handle_nickname_submitted(&mut self, event: &NicknameSubmitted, cx: &mut Context<Self>) {
        match self.session.submit_nickname(&event.candidate) {
            Ok(commands) => {
                self.feedback.nickname_locked();
                self.nickname_form
                    .update(cx, |form, cx| form.set_locked(true, cx));
                self.run_commands(commands, cx);
            }
            Err(error) => {
                tracing::debug!(error = %error, "nickname rejected");
                self.feedback.nickname_rejected(&error);
            }
        }
        self.sync_feedback(cx);
    }

    fn handle_disconnect(&mut self, cx: &mut Context<Self>) {
        self.session.disconnect();
        self.feedback.logged_out();
        self.nickname_form
            .update(cx, |form, cx| form.set_locked(false, cx));
        self.sync_feedback(cx);
        self.sync_children(cx);
    }

    fn handle_draft_changed(&mut self, event: &DraftChanged, cx: &mut Context<Self>) {
        self.feedback.draft_edited();
        self.sync_feedback(cx);
        let commands = self.session.update_draft(event.text.clone());
        self.run_commands(commands, cx);
    }

    fn handle_message_submitted(&mut self, window: &mut Window, cx: &mut Context<Self>) {
        match self.session.submit_message() {
            Ok(commands) => {
                self.feedback.message_sent();
                self.message_input
                    .update(cx, |input, cx| input.clear(window, cx));
                self.run_commands(commands, cx);
            }
            Err(error) => {
                tracing::debug!(error = %error, "message rejected");
                self.feedback.message_rejected(&error);
            }
        }
        self.sync_feedback(cx);
    }

    fn sync_feedback(&mut self, cx: &mut Context<Self>) {
        let nickname_error = self.feedback.nickname_error();
        let message_error = self.feedback.message_error();
        self.nickname_form
            .update(cx, |form, cx| form.set_error(nickname_error, cx));
        self.message_input
            .update(cx, |input, cx| input.set_error(message_error, cx));
    }

    fn run_commands(&mut self, commands: Vec<Command>, cx: &mut Context<Self>) {
        for command in commands {
            match command {
                Command::Emit(event) => self.emit(event),
                Command::Persist(message) => self.persist(message, cx),
                Command::FetchHistory => self.fetch_history(cx),
                Command::ScrollToLatest => {
                    self.message_list
                        .update(cx, |list, cx| list.request_scroll_to_bottom(cx));
                }
            }
        }

        self.sync_children(cx);
    }

    fn emit(&self, event: OutboundEvent) {
        let Some(sender) = self.transport.as_ref() else {
            tracing::warn!(event = event.name(), "dropping event, transport unavailable");
            return;
        };

        if let Err(error) = sender.emit(event) {
            tracing::warn!(error = %error, "failed to emit realtime event");
        }
    }

    fn persist(&self, message: ChatMessage, cx: &mut Context<Self>) {
        if let Some(job) = persist_job(self.history.clone(), message) {
            Tokio::spawn(cx, job).detach();
        }
    }

    fn fetch_history(&mut self, cx: &mut Context<Self>) {
        let Some(history) = self.history.clone() else {
            self.apply_history(Vec::new(), cx);
            return;
        };

        let fetch = Tokio::spawn(cx, async move { history.fetch_messages().await });
        self.history_task = Some(cx.spawn(async move |this, cx| {
            let messages = match fetch.await {
                Ok(Ok(messages)) => messages,
                Ok(Err(error)) => {
                    tracing::warn!(error = %error, "failed to fetch message history");
                    Vec::new()
                }
                Err(error) => {
                    tracing::warn!(error = ?error, "history fetch task failed");
                    Vec::new()
                }
            };

            let _ = this.update(cx, |this, cx| this.apply_history(messages, cx));
        }));
    }

    fn apply_history(&mut self, messages: Vec<ChatMessage>, cx: &mut Context<Self>) {
        let commands = self.session.history_loaded(messages);
        self.run_commands(commands, cx);
    }

    /// Pushes the session projection into the child views.
    fn sync_children(&mut self, cx: &mut Context<Self>) {
        let lines = self.session.lines();
        let indicator = self.session.typing_indicator();

        self.message_list
            .update(cx, |list, cx| list.set_lines(lines, cx));
        self.message_input
            .update(cx, |input, cx| input.set_typing_indicator(indicator, cx));
        cx.notify();
    }

    /// Dropping the reader task drops the subscription, which cancels the worker.
    fn teardown(&mut self) {
        self.session.teardown();
        self.transport = None;
        self.transport_reader_task = None;
        self.transport_worker_task = None;
        self.history_task = None;
    }
}

/// Fire-and-forget save of `message`; `None` when no history service exists.
fn persist_job(
    history: Option<Arc<dyn HistoryService>>,
    message: ChatMessage,
) -> Option<impl Future<Output = ()> + Send + 'static> {
    let Some(history) = history else {
        tracing::warn!(from = %message.from, "dropping message, history service unavailable");
        return None;
    };

    Some(async move {
        if let Err(error) = history.save(message).await {
            tracing::warn!(error = %error, "failed to persist message");
        }
    })
}

impl Render for ChatView {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();

        v_flex()
            .id("chat-view")
            .relative()
            .size_full()
            .min_h_0()
            .overflow_hidden()
            .bg(theme.background)
            .child(
                div()
                    .id("chat-view-nickname")
                    .flex_shrink_0()
                    .w_full()
                    .border_b_1()
                    .border_color(theme.border)
                    .child(self.nickname_form.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-list")
                    .flex_1()
                    .min_h_0()
                    .child(self.message_list.clone()),
            )
            .child(
                div()
                    .id("chat-view-message-input")
                    .flex_shrink_0()
                    .w_full()
                    .border_t_1()
                    .border_color(theme.border)
                    .child(self.message_input.clone()),
            )
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use charla_history::{BoxFuture, HistoryResult};

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[derive(Default)]
    struct RecordingHistory {
        saved: Mutex<Vec<ChatMessage>>,
    }

    impl HistoryService for RecordingHistory {
        fn base_url(&self) -> &str {
            "http://history.test/"
        }

        fn fetch_messages<'a>(&'a self) -> BoxFuture<'a, HistoryResult<Vec<ChatMessage>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn save<'a>(&'a self, message: ChatMessage) -> BoxFuture<'a, HistoryResult<()>> {
            self.saved.lock().unwrap().push(message);
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn persist_without_history_service_logs_the_dropped_message() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let job = tracing::subscriber::with_default(subscriber, || {
            persist_job(None, ChatMessage::new("ana", "hola"))
        });

        assert!(job.is_none());
        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("history service unavailable"), "{output}");
        assert!(output.contains("ana"), "{output}");
    }

    #[test]
    fn persist_saves_through_history_service() {
        let history = Arc::new(RecordingHistory::default());
        let service: Arc<dyn HistoryService> = history.clone();

        let job = persist_job(Some(service), ChatMessage::new("ana", "hola"))
            .expect("history service present");
        futures::executor::block_on(job);

        assert_eq!(
            *history.saved.lock().unwrap(),
            vec![ChatMessage::new("ana", "hola")]
        );
    }

    #[test]
    fn status_labels_are_spanish() {
        assert_eq!(ConnectionStatus::Connecting.label().to_string(), "Conectando...");
        assert_eq!(ConnectionStatus::Connected.label().to_string(), "Conectado");
        assert_eq!(
            ConnectionStatus::Disconnected("server closed".into())
                .label()
                .to_string(),
            "Desconectado: server closed"
        );
    }
}
