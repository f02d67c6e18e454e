//! Event broadcast hub
//!
//! [`EventHub`] owns the upstream connection and the subscriber registry.
//! One background task runs [`EventHub::run`], the dispatch loop; any other
//! task may subscribe, unsubscribe, or request shutdown concurrently.
//!
//! ```text
//!   Upstream ──read_frame()──► run() ──broadcast()──► SubscriberRegistry
//!                                │                      │      │
//!                     ShutdownLatch                     ▼      ▼
//!                  (request_shutdown)            Subscription Subscription
//! ```
//!
//! Teardown happens only inside `run`, after the loop has stopped touching
//! the upstream and the registry, so it runs exactly once.

pub mod dispatch;
pub mod shutdown;

pub use dispatch::EventHub;
pub use shutdown::ShutdownLatch;
