//! Registry error types

use super::event::SessionKey;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Session key already has an active subscription
    #[error("session already subscribed: {0}")]
    AlreadySubscribed(SessionKey),
    /// Session key has no subscription
    #[error("session not found: {0}")]
    SessionNotFound(SessionKey),
    /// Registry has been drained by hub shutdown
    #[error("subscriber registry is closed")]
    Closed,
}
