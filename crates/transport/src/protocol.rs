//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the text packets a chat client needs are supported; binary
//! attachments are rejected as malformed.

use charla_session::{ChatMessage, OutboundEvent, TypingStatus};
use serde::Deserialize;
use serde_json::{Value, json};
use snafu::{OptionExt, ResultExt};

use crate::config::DEFAULT_NAMESPACE;
use crate::error::{MalformedPacketSnafu, PacketPayloadSnafu, TransportResult};
use crate::transport::TransportEvent;

/// Handshake sent by the server in the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPayload {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(OpenPayload),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> TransportResult<Self> {
        let mut chars = frame.chars();
        let kind = chars.next().context(MalformedPacketSnafu {
            stage: "engine-decode-empty",
            details: "empty frame".to_string(),
        })?;
        let data = chars.as_str();

        match kind {
            '0' => {
                let payload = serde_json::from_str(data).context(PacketPayloadSnafu {
                    stage: "engine-decode-open",
                })?;
                Ok(Self::Open(payload))
            }
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(data.to_string())),
            '3' => Ok(Self::Pong(data.to_string())),
            '4' => Ok(Self::Message(data.to_string())),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => MalformedPacketSnafu {
                stage: "engine-decode-type",
                details: format!("unknown engine packet type '{other}'"),
            }
            .fail(),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Open(_) => "0".to_string(),
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{data}"),
            Self::Pong(data) => format!("3{data}"),
            Self::Message(data) => format!("4{data}"),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    pub fn connect(namespace: &str) -> Self {
        Self::Connect {
            namespace: namespace.to_string(),
            data: None,
        }
    }

    pub fn disconnect(namespace: &str) -> Self {
        Self::Disconnect {
            namespace: namespace.to_string(),
        }
    }

    pub fn event(namespace: &str, name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            namespace: namespace.to_string(),
            ack_id: None,
            name: name.into(),
            args,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decodes the payload of an Engine.IO `message` packet.
    pub fn decode(payload: &str) -> TransportResult<Self> {
        let mut chars = payload.chars();
        let kind = chars.next().context(MalformedPacketSnafu {
            stage: "socket-decode-empty",
            details: "empty socket packet".to_string(),
        })?;
        let rest = chars.as_str();

        let (namespace, rest) = match rest.strip_prefix('/') {
            Some(_) => match rest.find(',') {
                Some(index) => (&rest[..index], &rest[index + 1..]),
                None => (rest, ""),
            },
            None => (DEFAULT_NAMESPACE, rest),
        };
        let namespace = namespace.to_string();

        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let ack_id = if digits == 0 {
            None
        } else {
            let raw = &rest[..digits];
            Some(raw.parse::<u64>().map_err(|_| {
                MalformedPacketSnafu {
                    stage: "socket-decode-ack-id",
                    details: format!("invalid ack id '{raw}'"),
                }
                .build()
            })?)
        };
        let data = rest[digits..].trim();

        match kind {
            '0' => Ok(Self::Connect {
                namespace,
                data: parse_optional_json(data, "socket-decode-connect")?,
            }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut args = parse_array(data, "socket-decode-event")?;
                if args.is_empty() {
                    return MalformedPacketSnafu {
                        stage: "socket-decode-event-name",
                        details: "event packet without a name".to_string(),
                    }
                    .fail();
                }
                let Value::String(name) = args.remove(0) else {
                    return MalformedPacketSnafu {
                        stage: "socket-decode-event-name",
                        details: "event name is not a string".to_string(),
                    }
                    .fail();
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => {
                let ack_id = ack_id.context(MalformedPacketSnafu {
                    stage: "socket-decode-ack",
                    details: "ack packet without id".to_string(),
                })?;
                Ok(Self::Ack {
                    namespace,
                    ack_id,
                    args: parse_array(data, "socket-decode-ack")?,
                })
            }
            '4' => Ok(Self::ConnectError {
                namespace,
                data: parse_optional_json(data, "socket-decode-connect-error")?,
            }),
            other => MalformedPacketSnafu {
                stage: "socket-decode-type",
                details: format!("unsupported socket packet type '{other}'"),
            }
            .fail(),
        }
    }

    pub fn encode(&self) -> TransportResult<String> {
        let mut out = String::new();
        let (kind, namespace) = match self {
            Self::Connect { namespace, .. } => ('0', namespace),
            Self::Disconnect { namespace } => ('1', namespace),
            Self::Event { namespace, .. } => ('2', namespace),
            Self::Ack { namespace, .. } => ('3', namespace),
            Self::ConnectError { namespace, .. } => ('4', namespace),
        };
        out.push(kind);

        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }

        match self {
            Self::Connect { data, .. } | Self::ConnectError { data, .. } => {
                if let Some(data) = data {
                    out.push_str(&to_json(data, "socket-encode-data")?);
                }
            }
            Self::Disconnect { .. } => {}
            Self::Event {
                ack_id, name, args, ..
            } => {
                if let Some(ack_id) = ack_id {
                    out.push_str(&ack_id.to_string());
                }
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                out.push_str(&to_json(&Value::Array(array), "socket-encode-event")?);
            }
            Self::Ack { ack_id, args, .. } => {
                out.push_str(&ack_id.to_string());
                out.push_str(&to_json(&Value::Array(args.clone()), "socket-encode-ack")?);
            }
        }

        Ok(out)
    }

    /// Wraps the packet into a complete websocket text frame.
    pub fn to_frame(&self) -> TransportResult<String> {
        Ok(EnginePacket::Message(self.encode()?).encode())
    }
}

/// Maps a chat event into its Socket.IO event packet.
pub fn outbound_packet(namespace: &str, event: &OutboundEvent) -> SocketPacket {
    let args = match event {
        OutboundEvent::Nickname(nickname) => vec![json!(nickname)],
        OutboundEvent::Message { body, from } => vec![json!(body), json!(from)],
        OutboundEvent::Typing(status) => vec![json!({
            "isTyping": status.is_typing,
            "user": status.user,
        })],
    };
    SocketPacket::event(namespace, event.name(), args)
}

/// Maps an inbound Socket.IO event into a typed transport event.
///
/// Returns `Ok(None)` for events this client does not subscribe to.
pub fn inbound_event(name: &str, args: &[Value]) -> TransportResult<Option<TransportEvent>> {
    let first = || {
        args.first().cloned().context(MalformedPacketSnafu {
            stage: "inbound-event-args",
            details: format!("event '{name}' carries no payload"),
        })
    };

    match name {
        "message" => {
            let message: ChatMessage =
                serde_json::from_value(first()?).context(PacketPayloadSnafu {
                    stage: "inbound-message-payload",
                })?;
            Ok(Some(TransportEvent::Message(message)))
        }
        "typing" => {
            let status: TypingStatus =
                serde_json::from_value(first()?).context(PacketPayloadSnafu {
                    stage: "inbound-typing-payload",
                })?;
            Ok(Some(TransportEvent::Typing(status)))
        }
        _ => Ok(None),
    }
}

fn parse_optional_json(data: &str, stage: &'static str) -> TransportResult<Option<Value>> {
    if data.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(data)
        .map(Some)
        .context(PacketPayloadSnafu { stage })
}

fn parse_array(data: &str, stage: &'static str) -> TransportResult<Vec<Value>> {
    match serde_json::from_str::<Value>(data).context(PacketPayloadSnafu { stage })? {
        Value::Array(values) => Ok(values),
        other => MalformedPacketSnafu {
            stage,
            details: format!("expected a JSON array, got {other}"),
        }
        .fail(),
    }
}

fn to_json(value: &Value, stage: &'static str) -> TransportResult<String> {
    serde_json::to_string(value).context(PacketPayloadSnafu { stage })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn decodes_engine_handshake() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();

        let open = match packet {
            EnginePacket::Open(open) => open,
            other => panic!("expected open packet, got {other:?}"),
        };
        assert_eq!(open.sid, "lv_VI97HAXpY6yYWAAAC");
        assert_eq!(open.ping_interval, 25000);
        assert_eq!(open.max_payload, Some(1_000_000));
    }

    #[test]
    fn ping_is_answered_with_matching_pong() {
        let EnginePacket::Ping(data) = EnginePacket::decode("2probe").unwrap() else {
            panic!("expected ping");
        };
        assert_eq!(EnginePacket::Pong(data).encode(), "3probe");
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
    }

    #[test]
    fn decodes_event_with_namespace_and_ack() {
        let packet =
            SocketPacket::decode(r#"2/chat,12["message",{"from":"bob","body":"hola"}]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/chat".to_string(),
                ack_id: Some(12),
                name: "message".to_string(),
                args: vec![json!({"from": "bob", "body": "hola"})],
            }
        );
    }

    #[test]
    fn decodes_connect_acknowledgement() {
        let packet = SocketPacket::decode(r#"0{"sid":"abc"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Connect {
                namespace: "/".to_string(),
                data: Some(json!({"sid": "abc"})),
            }
        );
        assert_eq!(packet.namespace(), "/");
    }

    #[test]
    fn rejects_events_without_string_name() {
        assert!(matches!(
            SocketPacket::decode("2[]"),
            Err(TransportError::MalformedPacket { .. })
        ));
        assert!(matches!(
            SocketPacket::decode("2[42]"),
            Err(TransportError::MalformedPacket { .. })
        ));
        assert!(matches!(
            SocketPacket::decode("5[]"),
            Err(TransportError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn encodes_outbound_chat_events() {
        let nickname = outbound_packet("/", &OutboundEvent::Nickname("ana".to_string()));
        assert_eq!(nickname.to_frame().unwrap(), r#"42["nickname","ana"]"#);

        let message = outbound_packet(
            "/",
            &OutboundEvent::Message {
                body: "hola".to_string(),
                from: "ana".to_string(),
            },
        );
        assert_eq!(message.to_frame().unwrap(), r#"42["message","hola","ana"]"#);

        let typing = outbound_packet("/chat", &OutboundEvent::Typing(TypingStatus::new(true, "ana")));
        let frame = typing.to_frame().unwrap();
        assert!(frame.starts_with(r#"42/chat,["typing","#));
        let SocketPacket::Event { args, .. } = SocketPacket::decode(&frame[1..]).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(args, vec![json!({"isTyping": true, "user": "ana"})]);
    }

    #[test]
    fn connect_and_disconnect_frames() {
        assert_eq!(SocketPacket::connect("/").to_frame().unwrap(), "40");
        assert_eq!(SocketPacket::connect("/chat").to_frame().unwrap(), "40/chat,");
        assert_eq!(SocketPacket::disconnect("/").to_frame().unwrap(), "41");
    }

    #[test]
    fn maps_inbound_chat_events() {
        let message = inbound_event("message", &[json!({"from": "bob", "body": "hola"})]).unwrap();
        assert_eq!(
            message,
            Some(TransportEvent::Message(ChatMessage::new("bob", "hola")))
        );

        let typing = inbound_event("typing", &[json!({"isTyping": true, "user": "bob"})]).unwrap();
        assert_eq!(
            typing,
            Some(TransportEvent::Typing(TypingStatus::new(true, "bob")))
        );

        assert_eq!(inbound_event("presence", &[json!("x")]).unwrap(), None);
        assert!(inbound_event("message", &[]).is_err());
        assert!(inbound_event("message", &[json!("just text")]).is_err());
    }
}
