use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use charla_session::ChatMessage;

pub mod error;
pub mod http;
pub mod types;

pub use error::{HistoryError, HistoryResult};
pub use http::{DEFAULT_HISTORY_URL, DEFAULT_REQUEST_TIMEOUT, HistoryConfig, HttpHistoryService};
pub use types::{MessagesResponse, SaveRequest, StoredMessage};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request/response access to past messages.
pub trait HistoryService: Send + Sync {
    fn base_url(&self) -> &str;

    /// Fetches the stored messages in server order.
    fn fetch_messages<'a>(&'a self) -> BoxFuture<'a, HistoryResult<Vec<ChatMessage>>>;

    /// Persists one message. Callers may drop the result, but it reports
    /// failures so they can be logged.
    fn save<'a>(&'a self, message: ChatMessage) -> BoxFuture<'a, HistoryResult<()>>;
}

pub fn create_history_service(config: HistoryConfig) -> HistoryResult<Arc<dyn HistoryService>> {
    Ok(Arc::new(HttpHistoryService::new(config)?))
}
