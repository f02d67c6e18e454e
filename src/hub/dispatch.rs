//! Dispatch loop and public hub API

use std::sync::Arc;

use tokio::sync::Mutex;

use super::shutdown::ShutdownLatch;
use crate::error::{Error, Result};
use crate::registry::{Event, RegistryConfig, SessionKey, SubscriberRegistry, Subscription};
use crate::stats::{HubCounters, HubStats};
use crate::upstream::{Frame, Upstream};

/// Fan-out hub for one upstream connection
///
/// Share it behind an `Arc`: spawn [`run`](Self::run) once as the dispatch
/// task, and call the subscription methods from anywhere.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
///
/// use event_relay::client::{UpstreamConfig, UpstreamConnector};
/// use event_relay::registry::RegistryConfig;
///
/// # async fn example() -> event_relay::error::Result<()> {
/// let connector = UpstreamConnector::new(UpstreamConfig::new("ws://cardinal:4040/events"));
/// let hub = Arc::new(connector.connect_hub(RegistryConfig::default()).await?);
///
/// let dispatcher = tokio::spawn({
///     let hub = Arc::clone(&hub);
///     async move { hub.run().await }
/// });
///
/// let mut events = hub.subscribe("session-1").await?;
/// while let Some(event) = events.recv().await {
///     println!("{}", event.message());
/// }
///
/// hub.request_shutdown();
/// let _ = dispatcher.await;
/// # Ok(())
/// # }
/// ```
pub struct EventHub<U> {
    /// Taken by `run`; `None` once the dispatch loop has started
    upstream: Mutex<Option<U>>,
    registry: SubscriberRegistry,
    shutdown: ShutdownLatch,
    counters: HubCounters,
}

impl<U: Upstream> EventHub<U> {
    /// Create a hub over a live upstream connection
    pub fn new(upstream: U) -> Self {
        Self::with_config(upstream, RegistryConfig::default())
    }

    /// Create a hub with custom registry configuration
    pub fn with_config(upstream: U, config: RegistryConfig) -> Self {
        Self {
            upstream: Mutex::new(Some(upstream)),
            registry: SubscriberRegistry::with_config(config),
            shutdown: ShutdownLatch::new(),
            counters: HubCounters::new(),
        }
    }

    /// Register a session for delivery
    ///
    /// Fails with `AlreadySubscribed` if the key is active, and with
    /// `Closed` once the hub has torn down.
    pub async fn subscribe(&self, session: impl Into<SessionKey>) -> Result<Subscription> {
        Ok(self.registry.subscribe(session).await?)
    }

    /// Remove a session and close its channel
    ///
    /// Fails with `SessionNotFound` if the key is not registered.
    pub async fn unsubscribe(&self, session: impl Into<SessionKey>) -> Result<()> {
        Ok(self.registry.unsubscribe(&session.into()).await?)
    }

    /// Ask the dispatch loop to stop; safe to call any number of times
    pub fn request_shutdown(&self) {
        if self.shutdown.request() {
            tracing::info!("Event hub shutdown requested");
        }
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// The subscriber registry
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Current hub statistics
    pub async fn stats(&self) -> HubStats {
        self.counters
            .snapshot(self.registry.len().await, self.shutdown.is_requested())
    }

    /// Run the dispatch loop until shutdown
    ///
    /// Reads upstream frames and broadcasts each one. On shutdown (requested
    /// or caused by an upstream error) it closes every subscription, closes
    /// the upstream, and returns the triggering error joined with any close
    /// error. Can only be run once.
    pub async fn run(&self) -> Result<()> {
        let mut upstream = self
            .upstream
            .lock()
            .await
            .take()
            .ok_or(Error::AlreadyRunning)?;

        tracing::info!("Event dispatch started");

        let mut errors = Vec::new();
        if let Some(err) = self.dispatch(&mut upstream).await {
            errors.push(err);
        }

        let drained = self.registry.drain().await;

        if let Err(err) = upstream.close().await {
            tracing::warn!(error = %err, "Failed to close upstream");
            errors.push(err);
        }
        drop(upstream);

        tracing::info!(
            drained = drained.len(),
            errors = errors.len(),
            "Event hub shut down"
        );

        Error::join(errors)
    }

    /// Read and broadcast until the latch trips; returns the error that
    /// tripped it, if any
    async fn dispatch(&self, upstream: &mut U) -> Option<Error> {
        loop {
            if self.shutdown.is_requested() {
                return None;
            }

            let frame = tokio::select! {
                biased;
                _ = self.shutdown.requested() => return None,
                frame = upstream.read_frame() => frame,
            };

            let message = match frame {
                Ok(Frame::Text(message)) => message,
                Ok(other) => {
                    let err = Error::UnexpectedFrame(other.kind());
                    tracing::warn!(error = %err, "Protocol violation from upstream");
                    self.request_shutdown();
                    return Some(err);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Upstream read failed");
                    self.request_shutdown();
                    return Some(err);
                }
            };

            let report = self.registry.broadcast(Arc::new(Event::new(message))).await;
            self.counters.record(&report);

            tracing::debug!(
                delivered = report.delivered,
                dropped = report.dropped,
                skipped = report.skipped,
                "Event dispatched"
            );
        }
    }
}
