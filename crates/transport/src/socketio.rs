use charla_session::OutboundEvent;
use futures::{Sink, SinkExt, StreamExt};
use snafu::ResultExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use url::Url;

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult, WebSocketConnectSnafu, WebSocketIoSnafu};
use crate::protocol::{EnginePacket, SocketPacket, inbound_event, outbound_packet};
use crate::transport::{
    RealtimeTransport, TransportEvent, TransportHandle, TransportWorker, WorkerChannels,
    make_channels,
};

/// Socket.IO client over a single Engine.IO websocket.
///
/// No polling fallback and no reconnection: when the socket ends the
/// subscriber receives [`TransportEvent::Disconnected`] and the worker exits.
pub struct SocketIoTransport {
    config: TransportConfig,
    url: Url,
}

impl SocketIoTransport {
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        let url = config.websocket_url()?;
        Ok(Self { config, url })
    }

    pub fn websocket_url(&self) -> &Url {
        &self.url
    }

    async fn run_worker(url: Url, namespace: String, channels: WorkerChannels) {
        let WorkerChannels {
            mut outbound_rx,
            event_tx,
            mut cancel_rx,
        } = channels;

        let socket = tokio::select! {
            _ = &mut cancel_rx => {
                tracing::debug!(url = %url, "transport cancelled before connecting");
                return;
            }
            connected = connect_async(url.as_str()) => connected,
        };

        let socket = match socket.context(WebSocketConnectSnafu {
            stage: "worker-connect",
            url: url.to_string(),
        }) {
            Ok((socket, _response)) => socket,
            Err(error) => {
                tracing::error!(url = %url, error = %error, "failed to open realtime transport");
                Self::emit_disconnected(&event_tx, error.to_string());
                return;
            }
        };

        tracing::info!(url = %url, "realtime transport connected");
        let (mut sink, mut stream) = socket.split();
        let mut joined = false;

        let reason = loop {
            tokio::select! {
                _ = &mut cancel_rx => {
                    tracing::debug!(namespace = %namespace, "realtime transport torn down");
                    Self::close_socket(&mut sink, &namespace, joined).await;
                    return;
                }
                outbound = outbound_rx.recv(), if joined => {
                    let Some(event) = outbound else {
                        // Every sender is gone; treat it as teardown.
                        Self::close_socket(&mut sink, &namespace, joined).await;
                        return;
                    };
                    if let Err(error) = Self::send_event(&mut sink, &namespace, &event).await {
                        tracing::warn!(event = event.name(), error = %error, "failed to emit event");
                        if matches!(error, TransportError::WebSocketIo { .. }) {
                            break error.to_string();
                        }
                    }
                }
                frame = stream.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            match Self::handle_frame(&mut sink, &namespace, &event_tx, &mut joined, &text).await {
                                Ok(None) => {}
                                Ok(Some(reason)) => break reason,
                                Err(error @ TransportError::WebSocketIo { .. })
                                | Err(error @ TransportError::ConnectRejected { .. }) => {
                                    tracing::warn!(error = %error, "realtime transport failed");
                                    break error.to_string();
                                }
                                Err(error) => {
                                    // A single bad frame is dropped; the channel stays usable.
                                    tracing::warn!(error = %error, frame = %text, "ignoring malformed frame");
                                }
                            }
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            break frame
                                .map(|frame| frame.reason.to_string())
                                .filter(|reason| !reason.is_empty())
                                .unwrap_or_else(|| "server closed the connection".to_string());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(source)) => {
                            let error = TransportError::WebSocketIo {
                                stage: "worker-read-frame",
                                source,
                            };
                            tracing::warn!(error = %error, "realtime transport read failed");
                            break error.to_string();
                        }
                        None => break "connection ended".to_string(),
                    }
                }
            }
        };

        tracing::info!(reason = %reason, "realtime transport disconnected");
        Self::emit_disconnected(&event_tx, reason);
    }

    /// Handles one text frame; returns a reason when the session is over.
    async fn handle_frame<S>(
        sink: &mut S,
        namespace: &str,
        event_tx: &mpsc::UnboundedSender<TransportEvent>,
        joined: &mut bool,
        text: &str,
    ) -> TransportResult<Option<String>>
    where
        S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    {
        match EnginePacket::decode(text)? {
            EnginePacket::Open(open) => {
                tracing::debug!(sid = %open.sid, ping_interval = open.ping_interval, "engine handshake");
                Self::send_frame(sink, SocketPacket::connect(namespace).to_frame()?).await?;
            }
            EnginePacket::Ping(data) => {
                Self::send_frame(sink, EnginePacket::Pong(data).encode()).await?;
            }
            EnginePacket::Close => return Ok(Some("server closed the session".to_string())),
            EnginePacket::Message(payload) => {
                let packet = SocketPacket::decode(&payload)?;
                if packet.namespace() != namespace {
                    tracing::debug!(namespace = %packet.namespace(), "ignoring packet for other namespace");
                    return Ok(None);
                }

                match packet {
                    SocketPacket::Connect { .. } => {
                        *joined = true;
                        let _ = event_tx.send(TransportEvent::Connected);
                    }
                    SocketPacket::ConnectError { data, .. } => {
                        return Err(TransportError::ConnectRejected {
                            stage: "worker-join-namespace",
                            namespace: namespace.to_string(),
                            details: data.map(|data| data.to_string()).unwrap_or_default(),
                        });
                    }
                    SocketPacket::Disconnect { .. } => {
                        return Ok(Some("server disconnected the namespace".to_string()));
                    }
                    SocketPacket::Event { name, args, .. } => {
                        match inbound_event(&name, &args)? {
                            Some(event) => {
                                let _ = event_tx.send(event);
                            }
                            None => tracing::debug!(event = %name, "ignoring unsubscribed event"),
                        }
                    }
                    SocketPacket::Ack { ack_id, .. } => {
                        tracing::debug!(ack_id, "ignoring unexpected ack");
                    }
                }
            }
            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
        }

        Ok(None)
    }

    async fn send_event<S>(sink: &mut S, namespace: &str, event: &OutboundEvent) -> TransportResult<()>
    where
        S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    {
        let frame = outbound_packet(namespace, event).to_frame()?;
        Self::send_frame(sink, frame).await
    }

    async fn send_frame<S>(sink: &mut S, frame: String) -> TransportResult<()>
    where
        S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    {
        sink.send(WsMessage::Text(frame))
            .await
            .context(WebSocketIoSnafu {
                stage: "worker-send-frame",
            })
    }

    async fn close_socket<S>(sink: &mut S, namespace: &str, joined: bool)
    where
        S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
    {
        if joined {
            if let Ok(frame) = SocketPacket::disconnect(namespace).to_frame() {
                let _ = Self::send_frame(sink, frame).await;
            }
        }
        let _ = sink.close().await;
    }

    fn emit_disconnected(event_tx: &mpsc::UnboundedSender<TransportEvent>, reason: String) {
        let _ = event_tx.send(TransportEvent::Disconnected { reason });
    }
}

impl RealtimeTransport for SocketIoTransport {
    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn connect(&self) -> TransportResult<TransportHandle> {
        let (sender, subscription, channels) = make_channels();
        let worker: TransportWorker = Box::pin(Self::run_worker(
            self.url.clone(),
            self.config.namespace.clone(),
            channels,
        ));

        Ok(TransportHandle {
            sender,
            subscription,
            worker,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use charla_session::{ChatMessage, TypingStatus};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;

    const HANDSHAKE: &str =
        r#"0{"sid":"s1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    async fn next_text<S>(stream: &mut S) -> String
    where
        S: futures::Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
    {
        loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("expected a text frame, got {other:?}"),
            }
        }
    }

    async fn recv(subscription: &mut crate::TransportSubscription) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .expect("event within timeout")
            .expect("subscription open")
    }

    #[tokio::test]
    async fn exchanges_chat_events_with_socket_io_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let (flushed_tx, flushed_rx) = tokio::sync::oneshot::channel();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(tcp).await.unwrap();

            socket.send(WsMessage::Text(HANDSHAKE.to_string())).await.unwrap();
            assert_eq!(next_text(&mut socket).await, "40");

            for frame in [
                r#"40{"sid":"n1"}"#,
                "2",
                r#"42["typing",{"isTyping":true,"user":"bob"}]"#,
                r#"42["presence","bob"]"#,
                r#"42["message",{"from":"bob","body":"hola"}]"#,
            ] {
                socket.send(WsMessage::Text(frame.to_string())).await.unwrap();
            }

            // The pong races with queued emits; only emit order is fixed.
            let mut frames = Vec::new();
            for _ in 0..3 {
                frames.push(next_text(&mut socket).await);
            }
            assert!(frames.iter().any(|frame| frame == "3"), "no pong in {frames:?}");
            let emitted = frames
                .into_iter()
                .filter(|frame| frame != "3")
                .collect::<Vec<_>>();
            assert_eq!(
                emitted,
                [r#"42["nickname","ana"]"#, r#"42["message","buenas","ana"]"#]
            );
            let _ = flushed_tx.send(());

            assert_eq!(next_text(&mut socket).await, "41");
        });

        let transport =
            SocketIoTransport::new(TransportConfig::new(format!("http://{address}/"))).unwrap();
        let TransportHandle {
            sender,
            mut subscription,
            worker,
        } = transport.connect().unwrap();
        let worker = tokio::spawn(worker);

        // Queued before the namespace is joined; flushed once connected.
        sender
            .emit(OutboundEvent::Nickname("ana".to_string()))
            .unwrap();

        assert_eq!(recv(&mut subscription).await, TransportEvent::Connected);
        assert_eq!(
            recv(&mut subscription).await,
            TransportEvent::Typing(TypingStatus::new(true, "bob"))
        );
        assert_eq!(
            recv(&mut subscription).await,
            TransportEvent::Message(ChatMessage::new("bob", "hola"))
        );

        sender
            .emit(OutboundEvent::Message {
                body: "buenas".to_string(),
                from: "ana".to_string(),
            })
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), flushed_rx)
            .await
            .expect("server saw emitted events")
            .unwrap();
        assert!(subscription.unsubscribe());

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server finished")
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("worker finished")
            .unwrap();
    }

    #[tokio::test]
    async fn reports_disconnect_when_server_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(tcp).await.unwrap();
            socket.send(WsMessage::Text(HANDSHAKE.to_string())).await.unwrap();
            assert_eq!(next_text(&mut socket).await, "40");
            socket
                .send(WsMessage::Text(r#"44{"message":"not allowed"}"#.to_string()))
                .await
                .unwrap();
            let _ = socket.next().await;
        });

        let transport =
            SocketIoTransport::new(TransportConfig::new(format!("ws://{address}"))).unwrap();
        let TransportHandle {
            mut subscription,
            worker,
            ..
        } = transport.connect().unwrap();
        tokio::spawn(worker);

        let TransportEvent::Disconnected { reason } = recv(&mut subscription).await else {
            panic!("expected disconnect");
        };
        assert!(reason.contains("not allowed"), "unexpected reason: {reason}");
    }

    #[tokio::test]
    async fn reports_disconnect_when_connect_fails() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            SocketIoTransport::new(TransportConfig::new(format!("http://{address}/"))).unwrap();
        let TransportHandle {
            mut subscription,
            worker,
            ..
        } = transport.connect().unwrap();
        tokio::spawn(worker);

        assert!(matches!(
            recv(&mut subscription).await,
            TransportEvent::Disconnected { .. }
        ));
    }
}
