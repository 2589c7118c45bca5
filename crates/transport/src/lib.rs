use std::sync::Arc;

mod config;
mod error;
pub mod protocol;
mod socketio;
mod transport;

pub use config::{DEFAULT_NAMESPACE, DEFAULT_SERVER_URL, TransportConfig};
pub use error::{TransportError, TransportResult};
pub use socketio::SocketIoTransport;
pub use transport::{
    RealtimeTransport, TransportEvent, TransportHandle, TransportSender, TransportSubscription,
    TransportWorker,
};

/// Builds the realtime transport for `config`, validating the endpoint up front.
pub fn create_transport(config: TransportConfig) -> TransportResult<Arc<dyn RealtimeTransport>> {
    Ok(Arc::new(SocketIoTransport::new(config)?))
}
