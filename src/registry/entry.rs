//! Per-session delivery channel
//!
//! Each subscription is an mpsc channel paired with a cancellation token.
//! The token is the channel's "closed" state: once cancelled, the dispatch
//! loop stops sending and the receiving side reports end of stream, even if
//! events are still buffered.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use super::event::{Event, SessionKey};

/// Outcome of handing one event to one subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    /// Event is in the subscriber's buffer
    Delivered,
    /// Buffer was full and the event was skipped
    Dropped,
    /// Subscriber was closed before the event got in
    Closed,
    /// Subscriber dropped its handle without unsubscribing
    Gone,
}

/// Registry-side half of a subscription
#[derive(Clone)]
pub(super) struct SubscriberEntry {
    tx: mpsc::Sender<Arc<Event>>,
    closed: CancellationToken,
}

impl SubscriberEntry {
    /// Create an entry and the subscriber's receiving handle
    pub(super) fn new(key: SessionKey, capacity: usize) -> (Self, Subscription) {
        let (tx, rx) = mpsc::channel(capacity);
        let closed = CancellationToken::new();

        let subscription = Subscription {
            key,
            rx,
            closed_wait: Box::pin(closed.clone().cancelled_owned()),
            closed: closed.clone(),
        };

        (Self { tx, closed }, subscription)
    }

    /// Wait for buffer space, giving up if the subscription is closed meanwhile
    pub(super) async fn deliver(&self, event: Arc<Event>) -> Delivery {
        if self.closed.is_cancelled() {
            return Delivery::Closed;
        }

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Delivery::Closed,
            sent = self.tx.send(event) => match sent {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Gone,
            },
        }
    }

    /// Deliver only if the buffer has room right now
    pub(super) fn try_deliver(&self, event: Arc<Event>) -> Delivery {
        if self.closed.is_cancelled() {
            return Delivery::Closed;
        }

        match self.tx.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Gone,
        }
    }

    /// Mark the subscription closed; idempotent
    pub(super) fn close(&self) {
        self.closed.cancel();
    }
}

/// Receive-only handle returned by `subscribe`
///
/// Yields events in upstream order until the session is unsubscribed or the
/// hub shuts down. After closure every receive returns `None`; events that
/// were still buffered at that moment are discarded.
pub struct Subscription {
    key: SessionKey,
    rx: mpsc::Receiver<Arc<Event>>,
    closed: CancellationToken,
    closed_wait: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl Subscription {
    /// Session key this subscription was registered under
    pub fn session(&self) -> &SessionKey {
        &self.key
    }

    /// Receive the next event, or `None` once the subscription is closed
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        self.next().await
    }

    /// Whether the hub has closed this subscription
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl Stream for Subscription {
    type Item = Arc<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.closed.is_cancelled() || this.closed_wait.as_mut().poll(cx).is_ready() {
            return Poll::Ready(None);
        }

        this.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::{assert_pending, assert_ready, assert_ready_eq, task};

    use super::*;

    #[tokio::test]
    async fn test_deliver_and_receive() {
        let (entry, mut sub) = SubscriberEntry::new("a".into(), 4);

        let delivery = entry.deliver(Arc::new(Event::new("hello"))).await;
        assert_eq!(delivery, Delivery::Delivered);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.message(), "hello");
    }

    #[tokio::test]
    async fn test_close_discards_buffered_events() {
        let (entry, mut sub) = SubscriberEntry::new("a".into(), 4);

        entry.deliver(Arc::new(Event::new("stale"))).await;
        entry.close();

        assert!(sub.is_closed());
        assert!(sub.recv().await.is_none());
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_pending_receiver() {
        let (entry, mut sub) = SubscriberEntry::new("a".into(), 1);

        let mut recv = task::spawn(sub.recv());
        assert_pending!(recv.poll());

        entry.close();

        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), None);
    }

    #[tokio::test]
    async fn test_delivery_wakes_pending_receiver() {
        let (entry, mut sub) = SubscriberEntry::new("a".into(), 1);

        let mut recv = task::spawn(sub.recv());
        assert_pending!(recv.poll());

        entry.deliver(Arc::new(Event::new("wake"))).await;

        assert!(recv.is_woken());
        let event = assert_ready!(recv.poll()).unwrap();
        assert_eq!(event.message(), "wake");
    }

    #[tokio::test]
    async fn test_close_unblocks_stalled_deliver() {
        let (entry, _sub) = SubscriberEntry::new("a".into(), 1);
        entry.deliver(Arc::new(Event::new("fills buffer"))).await;

        let stalled = entry.clone();
        let sender =
            tokio::spawn(async move { stalled.deliver(Arc::new(Event::new("blocked"))).await });
        tokio::task::yield_now().await;
        entry.close();

        let delivery = tokio::time::timeout(Duration::from_secs(1), sender)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery, Delivery::Closed);
    }

    #[tokio::test]
    async fn test_try_deliver_full_and_gone() {
        let (entry, sub) = SubscriberEntry::new("a".into(), 1);

        assert_eq!(
            entry.try_deliver(Arc::new(Event::new("one"))),
            Delivery::Delivered
        );
        assert_eq!(
            entry.try_deliver(Arc::new(Event::new("two"))),
            Delivery::Dropped
        );

        drop(sub);
        assert_eq!(
            entry.try_deliver(Arc::new(Event::new("three"))),
            Delivery::Gone
        );
    }
}
