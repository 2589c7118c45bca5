use std::future::Future;
use std::pin::Pin;

use charla_session::{ChatMessage, OutboundEvent, TypingStatus};
use tokio::sync::{mpsc, oneshot};

use crate::error::{TransportError, TransportResult};

pub type TransportWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Typed notification delivered to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The server accepted the namespace connection.
    Connected,
    Message(ChatMessage),
    Typing(TypingStatus),
    /// The channel is gone; no further events follow.
    Disconnected { reason: String },
}

/// Bidirectional realtime event channel.
pub trait RealtimeTransport: Send + Sync {
    fn endpoint(&self) -> &str;

    /// Prepares a connection. Nothing touches the network until the returned
    /// worker is polled.
    fn connect(&self) -> TransportResult<TransportHandle>;
}

/// Connection halves plus the IO future that drives them.
pub struct TransportHandle {
    pub sender: TransportSender,
    pub subscription: TransportSubscription,
    pub worker: TransportWorker,
}

/// Cloneable emitter; events queue until the namespace is joined.
#[derive(Debug, Clone)]
pub struct TransportSender {
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl TransportSender {
    pub fn emit(&self, event: OutboundEvent) -> TransportResult<()> {
        let name = event.name();
        self.outbound
            .send(event)
            .map_err(|_| TransportError::ChannelClosed {
                stage: "transport-emit",
                event: name,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// Receiving side of the connection.
///
/// Unsubscribing, explicitly or by drop, tears the worker down so no event is
/// delivered afterwards.
pub struct TransportSubscription {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl TransportSubscription {
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        if self.cancel_tx.is_none() {
            return None;
        }
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<TransportEvent> {
        if self.cancel_tx.is_none() {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_subscribed(&self) -> bool {
        self.cancel_tx.is_some()
    }

    /// Stops delivery and signals the worker to close the socket.
    pub fn unsubscribe(&mut self) -> bool {
        self.events.close();
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for TransportSubscription {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

/// Worker-side channel ends.
pub(crate) struct WorkerChannels {
    pub outbound_rx: mpsc::UnboundedReceiver<OutboundEvent>,
    pub event_tx: mpsc::UnboundedSender<TransportEvent>,
    pub cancel_rx: oneshot::Receiver<()>,
}

pub(crate) fn make_channels() -> (TransportSender, TransportSubscription, WorkerChannels) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();

    (
        TransportSender {
            outbound: outbound_tx,
        },
        TransportSubscription {
            events: event_rx,
            cancel_tx: Some(cancel_tx),
        },
        WorkerChannels {
            outbound_rx,
            event_tx,
            cancel_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_fails_once_worker_is_gone() {
        let (sender, _subscription, channels) = make_channels();
        drop(channels);

        let error = sender
            .emit(OutboundEvent::Nickname("ana".to_string()))
            .unwrap_err();
        assert!(matches!(
            error,
            TransportError::ChannelClosed {
                event: "nickname",
                ..
            }
        ));
        assert!(sender.is_closed());
    }

    #[test]
    fn unsubscribe_signals_worker_and_stops_delivery() {
        let (_sender, mut subscription, mut channels) = make_channels();
        channels
            .event_tx
            .send(TransportEvent::Connected)
            .unwrap();

        assert!(subscription.unsubscribe());
        assert!(!subscription.is_subscribed());
        assert_eq!(subscription.try_recv(), None);
        assert_eq!(channels.cancel_rx.try_recv(), Ok(()));
        assert!(channels.event_tx.send(TransportEvent::Connected).is_err());
    }

    #[test]
    fn dropping_subscription_signals_worker() {
        let (_sender, subscription, mut channels) = make_channels();
        drop(subscription);
        assert_eq!(channels.cancel_rx.try_recv(), Ok(()));
    }
}
