//! One-way shutdown latch

use tokio_util::sync::CancellationToken;

/// Flag that, once set, tells the dispatch loop to stop
///
/// Setting it only signals; it never closes anything itself.
#[derive(Debug, Default)]
pub struct ShutdownLatch {
    token: CancellationToken,
}

impl ShutdownLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch. Returns `false` if it was already tripped.
    ///
    /// The result only gates the "shutdown requested" log line: two callers
    /// racing on an untripped latch may both see `true`.
    pub fn request(&self) -> bool {
        let first = !self.token.is_cancelled();
        self.token.cancel();
        first
    }

    /// Whether shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is requested
    pub async fn requested(&self) {
        self.token.cancelled().await
    }
}
