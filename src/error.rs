//! Error types for the event relay
//!
//! A single crate-wide [`Error`] covers connection bring-up, the upstream
//! stream, and registry misuse. Teardown errors are joined into
//! [`Error::Multiple`] so nothing raised during shutdown is dropped.

use std::io;

use tokio_tungstenite::tungstenite;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream URL could not be parsed or uses an unsupported scheme
    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },

    /// Host name did not resolve (retryable during bring-up)
    #[error("failed to resolve upstream host {host}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// TCP connect failed or timed out
    #[error("failed to connect to upstream")]
    Connect(#[source] io::Error),

    /// WebSocket handshake or transport error
    #[error("websocket error")]
    WebSocket(#[from] tungstenite::Error),

    /// Resolution kept failing past the configured retry cap
    #[error("upstream still unresolved after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    /// Upstream sent a close frame or reached end of stream
    #[error("upstream connection closed")]
    UpstreamClosed,

    /// Upstream delivered a frame that is not text
    #[error("unexpected {0} frame from upstream")]
    UnexpectedFrame(&'static str),

    /// Subscriber registry misuse
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The dispatch loop was started a second time
    #[error("event hub is already running or has finished")]
    AlreadyRunning,

    /// Several errors raised together during teardown
    #[error("{}", join_messages(.0))]
    Multiple(Vec<Error>),
}

impl Error {
    /// Whether this error is a name-resolution failure
    pub fn is_resolve(&self) -> bool {
        matches!(self, Error::Resolve { .. })
    }

    /// Collapse a list of errors into a single result.
    ///
    /// Empty is `Ok`, a single error is returned as-is, more are joined.
    pub fn join(mut errors: Vec<Error>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Multiple(errors)),
        }
    }

    /// Flattened view of the errors carried by this value
    pub fn errors(&self) -> Vec<&Error> {
        match self {
            Error::Multiple(inner) => inner.iter().flat_map(Error::errors).collect(),
            other => vec![other],
        }
    }
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
