//! Upstream client
//!
//! Opens the single upstream connection the hub consumes:
//! - Builds and validates the upstream address
//! - Retries while the host name does not resolve yet
//! - Hands the live connection to a new `EventHub`

pub mod config;
pub mod connector;

pub use config::UpstreamConfig;
pub use connector::{Dialer, UpstreamConnector, UpstreamTarget, WsDialer};
