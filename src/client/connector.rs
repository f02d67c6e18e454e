//! Upstream connector with resolution retry
//!
//! A name-resolution failure means the upstream host is not reachable yet
//! (typically a sibling service still starting), so the connector waits a
//! fixed delay and tries again. Every other failure is returned at once.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::http::Uri;

use super::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::hub::EventHub;
use crate::registry::RegistryConfig;
use crate::upstream::{Upstream, WsUpstream};

/// Parsed upstream address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Full URL used for the WebSocket handshake
    pub url: String,
    /// Host name or IP literal (without brackets)
    pub host: String,
    pub port: u16,
}

impl UpstreamTarget {
    /// Parse and validate a `ws://` URL
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidUrl {
            url: url.to_owned(),
            reason,
        };

        let uri: Uri = url.parse().map_err(|_| invalid("not a valid URI"))?;

        match uri.scheme_str() {
            Some("ws") => {}
            Some("wss") => return Err(invalid("TLS upstreams are not supported")),
            _ => return Err(invalid("scheme must be ws")),
        }

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host"))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_owned();

        Ok(Self {
            url: url.to_owned(),
            host,
            port: uri.port_u16().unwrap_or(80),
        })
    }
}

/// Opens one connection attempt to the upstream
pub trait Dialer: Send + Sync {
    /// Connection type handed to the hub
    type Connection: Upstream;

    /// Make a single attempt. Resolution failures must be `Error::Resolve`.
    fn dial(&self, target: &UpstreamTarget)
        -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// Dials plain `ws://` upstreams with `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

impl Dialer for WsDialer {
    type Connection = WsUpstream;

    async fn dial(&self, target: &UpstreamTarget) -> Result<WsUpstream> {
        let resolve_error = |source| Error::Resolve {
            host: target.host.clone(),
            source,
        };

        // Resolve separately so lookup failures can be told apart from
        // connect failures
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((target.host.as_str(), target.port))
            .await
            .map_err(resolve_error)?
            .collect();
        if addrs.is_empty() {
            return Err(resolve_error(io::Error::new(
                io::ErrorKind::NotFound,
                "host resolved to no addresses",
            )));
        }

        let stream = TcpStream::connect(&addrs[..])
            .await
            .map_err(Error::Connect)?;
        stream.set_nodelay(true).map_err(Error::Connect)?;

        let (ws, response) = tokio_tungstenite::client_async(target.url.as_str(), stream).await?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(ws)
    }
}

/// Establishes the upstream connection, retrying unresolved hosts
pub struct UpstreamConnector<D = WsDialer> {
    config: UpstreamConfig,
    dialer: D,
}

impl UpstreamConnector<WsDialer> {
    /// Create a connector that dials real WebSocket upstreams
    pub fn new(config: UpstreamConfig) -> Self {
        Self::with_dialer(config, WsDialer)
    }
}

impl<D: Dialer> UpstreamConnector<D> {
    /// Create a connector with a custom dialer
    pub fn with_dialer(config: UpstreamConfig, dialer: D) -> Self {
        Self { config, dialer }
    }

    /// Get the connector configuration
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Open the upstream connection
    ///
    /// Retries name-resolution failures every `retry_delay`, up to
    /// `max_retries` if set. Any other error is returned immediately.
    pub async fn connect(&self) -> Result<D::Connection> {
        let target = UpstreamTarget::parse(&self.config.url)?;
        let mut failures: u32 = 0;

        loop {
            match self.attempt(&target).await {
                Ok(connection) => {
                    tracing::info!(
                        url = %target.url,
                        attempts = failures + 1,
                        "Connected to upstream"
                    );
                    return Ok(connection);
                }
                Err(err) if err.is_resolve() => {
                    failures += 1;

                    if self.config.max_retries.is_some_and(|max| failures > max) {
                        return Err(Error::RetriesExhausted {
                            attempts: failures,
                            source: Box::new(err),
                        });
                    }

                    tracing::warn!(
                        host = %target.host,
                        attempt = failures,
                        retry_in_ms = self.config.retry_delay.as_millis() as u64,
                        error = %err,
                        "Upstream host not found, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(err) => {
                    tracing::error!(url = %target.url, error = %err, "Failed to connect to upstream");
                    return Err(err);
                }
            }
        }
    }

    /// Connect and wrap the connection in a new hub
    pub async fn connect_hub(&self, registry: RegistryConfig) -> Result<EventHub<D::Connection>> {
        let upstream = self.connect().await?;
        Ok(EventHub::with_config(upstream, registry))
    }

    async fn attempt(&self, target: &UpstreamTarget) -> Result<D::Connection> {
        match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.dialer.dial(target))
                .await
                .map_err(|_| {
                    Error::Connect(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "upstream connect timed out",
                    ))
                })?,
            None => self.dialer.dial(target).await,
        }
    }
}
