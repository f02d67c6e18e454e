//! In-memory upstream for driving the hub in tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::{Frame, Upstream};
use crate::error::{Error, Result};

/// Upstream fed through a channel; dropping the feeder ends the stream
pub(crate) struct ScriptedUpstream {
    frames: mpsc::UnboundedReceiver<Result<Frame>>,
    closes: Arc<AtomicUsize>,
    close_error: Option<Error>,
}

/// Test-side controls for a `ScriptedUpstream`
pub(crate) struct UpstreamFeed {
    tx: mpsc::UnboundedSender<Result<Frame>>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedUpstream {
    pub(crate) fn new() -> (Self, UpstreamFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));

        let upstream = Self {
            frames: rx,
            closes: Arc::clone(&closes),
            close_error: None,
        };

        (upstream, UpstreamFeed { tx, closes })
    }

    /// Make `close` fail with the given error
    pub(crate) fn fail_close_with(mut self, err: Error) -> Self {
        self.close_error = Some(err);
        self
    }
}

impl UpstreamFeed {
    pub(crate) fn text(&self, message: &str) {
        let _ = self.tx.send(Ok(Frame::Text(message.to_owned())));
    }

    pub(crate) fn frame(&self, frame: Frame) {
        let _ = self.tx.send(Ok(frame));
    }

    pub(crate) fn fail(&self, err: Error) {
        let _ = self.tx.send(Err(err));
    }

    /// Number of times the upstream was closed
    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Upstream for ScriptedUpstream {
    async fn read_frame(&mut self) -> Result<Frame> {
        match self.frames.recv().await {
            Some(frame) => frame,
            None => Err(Error::UpstreamClosed),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        match self.close_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
