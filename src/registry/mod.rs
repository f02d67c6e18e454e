//! Subscriber registry for session fan-out
//!
//! The registry maps each session key to one delivery channel. The dispatch
//! loop broadcasts every upstream event through it, while any task may
//! subscribe or unsubscribe concurrently.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SubscriberRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ subscribers: HashMap<Key,    │
//!                 │   SubscriberEntry {          │
//!                 │     tx: mpsc::Sender,        │
//!                 │     closed: CancelToken,     │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//!   [Dispatch loop]        [Subscription]         [Subscription]
//!   registry.broadcast()   sub.recv()             sub.recv()
//! ```
//!
//! Every subscriber receives the same `Arc<Event>`; the payload is never
//! copied per subscriber.

pub mod config;
pub mod entry;
pub mod error;
pub mod event;
pub mod store;

pub use config::{DeliveryMode, RegistryConfig};
pub use entry::Subscription;
pub use error::RegistryError;
pub use event::{Event, SessionKey};
pub use store::{BroadcastReport, SubscriberRegistry};
