//! Subscriber registry implementation
//!
//! The central map of session keys to delivery channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::{DeliveryMode, RegistryConfig};
use super::entry::{Delivery, SubscriberEntry, Subscription};
use super::error::RegistryError;
use super::event::{Event, SessionKey};

/// Per-broadcast delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that received the event
    pub delivered: usize,
    /// Subscribers whose buffer was full (`SkipWhenFull` only)
    pub dropped: usize,
    /// Subscribers that were closed or gone when their turn came
    pub skipped: usize,
}

/// Concurrency-safe map of session key to delivery channel
///
/// Thread-safe via `RwLock`. Broadcasting only holds the read lock long
/// enough to snapshot the entries, so subscribe and unsubscribe are never
/// stuck behind a slow subscriber.
pub struct SubscriberRegistry {
    /// Map of session key to subscriber entry
    subscribers: RwLock<HashMap<SessionKey, SubscriberEntry>>,

    /// Set once by `drain`; no subscriptions are accepted afterwards
    closed: AtomicBool,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a session and return its receiving handle
    ///
    /// A key maps to at most one subscription; subscribing an active key
    /// again is rejected rather than replacing the existing channel.
    pub async fn subscribe(
        &self,
        key: impl Into<SessionKey>,
    ) -> Result<Subscription, RegistryError> {
        let key = key.into();
        let mut subscribers = self.subscribers.write().await;

        if self.closed.load(Ordering::Acquire) {
            return Err(RegistryError::Closed);
        }
        if subscribers.contains_key(&key) {
            return Err(RegistryError::AlreadySubscribed(key));
        }

        let (entry, subscription) = SubscriberEntry::new(key.clone(), self.config.channel_capacity);
        subscribers.insert(key.clone(), entry);

        tracing::info!(
            session = %key,
            subscribers = subscribers.len(),
            "Subscriber added"
        );

        Ok(subscription)
    }

    /// Remove a session and close its channel
    ///
    /// Unsubscribing a key that is not registered is a caller bug and is
    /// reported as `SessionNotFound`.
    pub async fn unsubscribe(&self, key: &SessionKey) -> Result<(), RegistryError> {
        let mut subscribers = self.subscribers.write().await;

        let entry = subscribers
            .remove(key)
            .ok_or_else(|| RegistryError::SessionNotFound(key.clone()))?;
        entry.close();

        tracing::info!(
            session = %key,
            subscribers = subscribers.len(),
            "Subscriber removed"
        );

        Ok(())
    }

    /// Deliver one event to every registered subscriber
    ///
    /// Subscribers are visited one at a time in map order. A subscriber added
    /// while a broadcast is in flight may miss that event; one removed while
    /// in flight is skipped.
    pub async fn broadcast(&self, event: Arc<Event>) -> BroadcastReport {
        let targets: Vec<(SessionKey, SubscriberEntry)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect()
        };

        let mut report = BroadcastReport::default();

        for (key, entry) in targets {
            let delivery = match self.config.delivery_mode {
                DeliveryMode::Blocking => entry.deliver(Arc::clone(&event)).await,
                DeliveryMode::SkipWhenFull => entry.try_deliver(Arc::clone(&event)),
            };

            match delivery {
                Delivery::Delivered => report.delivered += 1,
                Delivery::Dropped => {
                    report.dropped += 1;
                    tracing::warn!(session = %key, "Subscriber buffer full, event dropped");
                }
                Delivery::Closed => report.skipped += 1,
                Delivery::Gone => {
                    report.skipped += 1;
                    tracing::debug!(session = %key, "Subscriber handle dropped without unsubscribe");
                }
            }
        }

        report
    }

    /// Close every subscription and refuse new ones
    ///
    /// Returns the keys that were drained. Logs once per session.
    pub async fn drain(&self) -> Vec<SessionKey> {
        let drained: Vec<(SessionKey, SubscriberEntry)> = {
            let mut subscribers = self.subscribers.write().await;
            self.closed.store(true, Ordering::Release);
            subscribers.drain().collect()
        };

        drained
            .into_iter()
            .map(|(key, entry)| {
                tracing::info!(session = %key, "Shutting down subscriber");
                entry.close();
                key
            })
            .collect()
    }

    /// Check whether a session is registered
    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.subscribers.read().await.contains_key(key)
    }

    /// Registered session keys, in no particular order
    pub async fn sessions(&self) -> Vec<SessionKey> {
        self.subscribers.read().await.keys().cloned().collect()
    }

    /// Number of registered subscribers
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Whether `drain` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn event(message: &str) -> Arc<Event> {
        Arc::new(Event::new(message))
    }

    #[tokio::test]
    async fn test_subscribe_and_broadcast() {
        let registry = SubscriberRegistry::with_config(RegistryConfig::default().channel_capacity(4));

        let mut a = registry.subscribe("a").await.unwrap();
        let mut b = registry.subscribe("b").await.unwrap();

        let report = registry.broadcast(event("hello")).await;
        assert_eq!(report.delivered, 2);

        assert_eq!(a.recv().await.unwrap().message(), "hello");
        assert_eq!(b.recv().await.unwrap().message(), "hello");
    }

    #[tokio::test]
    async fn test_subscribers_share_one_event() {
        let registry = SubscriberRegistry::new();
        let mut a = registry.subscribe("a").await.unwrap();
        let mut b = registry.subscribe("b").await.unwrap();

        registry.broadcast(event("shared")).await;

        let from_a = a.recv().await.unwrap();
        let from_b = b.recv().await.unwrap();
        assert!(Arc::ptr_eq(&from_a, &from_b));
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_rejected() {
        let registry = SubscriberRegistry::new();
        let mut first = registry.subscribe("a").await.unwrap();

        let result = registry.subscribe("a").await;
        assert_eq!(
            result.unwrap_err(),
            RegistryError::AlreadySubscribed(SessionKey::from("a"))
        );

        // First subscription is untouched
        assert!(!first.is_closed());
        registry.broadcast(event("still here")).await;
        assert_eq!(first.recv().await.unwrap().message(), "still here");
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_channel() {
        let registry = SubscriberRegistry::new();
        let mut sub = registry.subscribe("a").await.unwrap();

        registry.unsubscribe(&"a".into()).await.unwrap();

        assert!(sub.recv().await.is_none());
        assert!(!registry.contains(&"a".into()).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_session() {
        let registry = SubscriberRegistry::new();

        let result = registry.unsubscribe(&"ghost".into()).await;
        assert_eq!(
            result.unwrap_err(),
            RegistryError::SessionNotFound(SessionKey::from("ghost"))
        );
    }

    #[tokio::test]
    async fn test_double_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let _sub = registry.subscribe("a").await.unwrap();

        registry.unsubscribe(&"a".into()).await.unwrap();
        let result = registry.unsubscribe(&"a".into()).await;
        assert!(matches!(result, Err(RegistryError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_resubscribe_after_unsubscribe() {
        let registry = SubscriberRegistry::new();
        let old = registry.subscribe("a").await.unwrap();
        registry.unsubscribe(&"a".into()).await.unwrap();

        let mut new = registry.subscribe("a").await.unwrap();
        registry.broadcast(event("fresh")).await;

        assert!(old.is_closed());
        assert_eq!(new.recv().await.unwrap().message(), "fresh");
    }

    #[tokio::test]
    async fn test_unsubscribe_unblocks_stalled_broadcast() {
        let registry = Arc::new(SubscriberRegistry::new());
        let _stalled = registry.subscribe("stalled").await.unwrap();

        // Capacity 1: the first event fills the buffer, the second blocks
        registry.broadcast(event("one")).await;

        let broadcaster = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.broadcast(event("two")).await })
        };
        tokio::task::yield_now().await;

        registry.unsubscribe(&"stalled".into()).await.unwrap();

        let report = tokio::time::timeout(Duration::from_secs(1), broadcaster)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.delivered, 0);
    }

    #[tokio::test]
    async fn test_skip_when_full() {
        let config = RegistryConfig::default().delivery_mode(DeliveryMode::SkipWhenFull);
        let registry = SubscriberRegistry::with_config(config);
        let mut slow = registry.subscribe("slow").await.unwrap();

        assert_eq!(registry.broadcast(event("one")).await.delivered, 1);
        assert_eq!(registry.broadcast(event("two")).await.dropped, 1);

        assert_eq!(slow.recv().await.unwrap().message(), "one");
        assert_eq!(registry.broadcast(event("three")).await.delivered, 1);
        assert_eq!(slow.recv().await.unwrap().message(), "three");
    }

    #[tokio::test]
    async fn test_dropped_handle_is_skipped() {
        let registry = SubscriberRegistry::new();
        let sub = registry.subscribe("a").await.unwrap();
        drop(sub);

        let report = registry.broadcast(event("nobody home")).await;
        assert_eq!(report.skipped, 1);

        // Entry stays until the owner unsubscribes
        assert!(registry.contains(&"a".into()).await);
        registry.unsubscribe(&"a".into()).await.unwrap();
    }

    fn sequence(event: &Event) -> u32 {
        event.message().parse().unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_churn_keeps_every_stream_contiguous() {
        const EVENTS: u32 = 200;
        const ROUNDS: u32 = 50;

        let registry = Arc::new(SubscriberRegistry::with_config(
            RegistryConfig::default().channel_capacity(4),
        ));
        let mut stable = registry.subscribe("stable").await.unwrap();

        let broadcaster = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                for i in 0..EVENTS {
                    registry.broadcast(event(&i.to_string())).await;
                }
            })
        };

        let churn = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let mut readers = Vec::new();
                for round in 0..ROUNDS {
                    let key = SessionKey::from(format!("churn-{round}"));
                    let mut sub = registry.subscribe(&key).await.unwrap();

                    readers.push(tokio::spawn(async move {
                        let mut seen = Vec::new();
                        while let Some(event) = sub.recv().await {
                            seen.push(sequence(&event));
                        }
                        seen
                    }));

                    tokio::task::yield_now().await;
                    registry.unsubscribe(&key).await.unwrap();
                }
                readers
            })
        };

        let from_stable = tokio::time::timeout(Duration::from_secs(10), async {
            let mut seen = Vec::new();
            while seen.len() < EVENTS as usize {
                seen.push(sequence(&stable.recv().await.unwrap()));
            }
            seen
        })
        .await
        .expect("stable subscriber stalled");
        assert_eq!(from_stable, (0..EVENTS).collect::<Vec<_>>());

        tokio::time::timeout(Duration::from_secs(10), broadcaster)
            .await
            .unwrap()
            .unwrap();
        let readers = churn.await.unwrap();

        // A late joiner may miss a prefix and an early leaver a suffix, but
        // nothing in between may be skipped, repeated or reordered
        for reader in readers {
            let seen = tokio::time::timeout(Duration::from_secs(10), reader)
                .await
                .unwrap()
                .unwrap();
            assert!(
                seen.windows(2).all(|w| w[1] == w[0] + 1),
                "gap or reorder in {seen:?}"
            );
        }

        assert_eq!(registry.drain().await, vec![SessionKey::from("stable")]);
        assert!(stable.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drain_closes_all_and_rejects_new() {
        let registry = SubscriberRegistry::new();
        let mut a = registry.subscribe("a").await.unwrap();
        let mut b = registry.subscribe("b").await.unwrap();

        let mut drained = registry.drain().await;
        drained.sort();
        assert_eq!(drained, vec![SessionKey::from("a"), SessionKey::from("b")]);

        assert!(a.recv().await.is_none());
        assert!(b.recv().await.is_none());
        assert!(registry.is_empty().await);
        assert!(registry.is_closed());

        let result = registry.subscribe("c").await;
        assert_eq!(result.unwrap_err(), RegistryError::Closed);
    }
}
