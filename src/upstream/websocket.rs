//! WebSocket upstream over `tokio-tungstenite`

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

use super::{Frame, Upstream};
use crate::error::{Error, Result};

/// Plain-TCP WebSocket connection produced by `WsDialer`
pub type WsUpstream = WebSocketStream<TcpStream>;

impl<S> Upstream for WebSocketStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                // Control frames are answered by tungstenite itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(close_frame = ?frame, "Upstream sent close frame");
                    return Err(Error::UpstreamClosed);
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::UpstreamClosed),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match SinkExt::close(self).await {
            Ok(()) => Ok(()),
            // Remote end already finished the closing handshake
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
