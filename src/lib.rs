//! Real-time event relay
//!
//! Holds one upstream WebSocket connection to an event source and fans out
//! every text frame to a dynamic set of subscribers keyed by session.
//!
//! - [`client`]: connection bring-up, retrying while the host does not resolve
//! - [`registry`]: session key to delivery channel map
//! - [`hub`]: the dispatch loop and its one-way shutdown latch
//! - [`upstream`]: the frame source abstraction and its WebSocket implementation
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use event_relay::{EventHub, RegistryConfig, UpstreamConfig, UpstreamConnector};
//!
//! # async fn example() -> event_relay::Result<()> {
//! let config = UpstreamConfig::from_endpoint("cardinal:4040", "events");
//! let hub = Arc::new(
//!     UpstreamConnector::new(config)
//!         .connect_hub(RegistryConfig::default())
//!         .await?,
//! );
//!
//! let dispatcher = tokio::spawn({
//!     let hub = Arc::clone(&hub);
//!     async move { hub.run().await }
//! });
//!
//! let mut events = hub.subscribe("player-1").await?;
//! if let Some(event) = events.recv().await {
//!     println!("first event: {}", event.message());
//! }
//! hub.unsubscribe("player-1").await?;
//!
//! hub.request_shutdown();
//! if let Ok(Err(e)) = dispatcher.await {
//!     eprintln!("hub stopped with error: {e}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod hub;
pub mod registry;
pub mod stats;
pub mod upstream;

pub use client::{UpstreamConfig, UpstreamConnector};
pub use error::{Error, Result};
pub use hub::EventHub;
pub use registry::{DeliveryMode, Event, RegistryConfig, SessionKey, Subscription};
pub use stats::HubStats;
