use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("invalid transport endpoint '{endpoint}': {source}"))]
    InvalidEndpoint {
        stage: &'static str,
        endpoint: String,
        source: url::ParseError,
    },
    #[snafu(display("transport endpoint '{endpoint}' uses unsupported scheme '{scheme}'"))]
    UnsupportedScheme {
        stage: &'static str,
        endpoint: String,
        scheme: String,
    },
    #[snafu(display("websocket connect to '{url}' failed on `{stage}`: {source}"))]
    WebSocketConnect {
        stage: &'static str,
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[snafu(display("websocket io failed on `{stage}`: {source}"))]
    WebSocketIo {
        stage: &'static str,
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[snafu(display("malformed packet on `{stage}`: {details}"))]
    MalformedPacket {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("failed to encode or decode packet payload on `{stage}`: {source}"))]
    PacketPayload {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("server rejected namespace '{namespace}': {details}"))]
    ConnectRejected {
        stage: &'static str,
        namespace: String,
        details: String,
    },
    #[snafu(display("cannot emit '{event}': transport connection is closed"))]
    ChannelClosed {
        stage: &'static str,
        event: &'static str,
    },
}

pub type TransportResult<T> = Result<T, TransportError>;
