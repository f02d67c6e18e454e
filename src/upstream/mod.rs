//! Upstream event source
//!
//! The hub reads exactly one upstream connection through the [`Upstream`]
//! trait. The WebSocket implementation lives in [`websocket`]; tests drive
//! the hub with an in-memory source instead.

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use websocket::WsUpstream;

/// One data frame read from upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload; becomes an `Event`
    Text(String),
    /// Binary payload; the hub treats it as a protocol violation
    Binary(Bytes),
}

impl Frame {
    /// Short name of the frame kind, for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
        }
    }
}

/// A streaming connection the hub reads frames from
///
/// Implementations hide transport control traffic (pings, pongs) and
/// surface only data frames. A clean close from the remote end is reported
/// as `Error::UpstreamClosed`.
pub trait Upstream: Send {
    /// Wait for the next data frame
    fn read_frame(&mut self) -> impl Future<Output = Result<Frame>> + Send;

    /// Close the connection
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
