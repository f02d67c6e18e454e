//! Registry configuration

/// How the dispatch loop hands an event to a subscriber whose buffer is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Wait until the subscriber has room.
    ///
    /// A stalled subscriber holds up delivery to everyone behind it until it
    /// reads, is unsubscribed, or drops its handle.
    #[default]
    Blocking,
    /// Drop the event for that subscriber only and move on
    SkipWhenFull,
}

/// Configuration for the subscriber registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Per-subscriber channel buffer, in events (minimum 1)
    pub channel_capacity: usize,

    /// Behaviour when a subscriber's buffer is full
    pub delivery_mode: DeliveryMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            delivery_mode: DeliveryMode::Blocking,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber buffer size
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set the delivery mode
    pub fn delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.delivery_mode, DeliveryMode::Blocking);
    }

    #[test]
    fn test_channel_capacity_floor() {
        let config = RegistryConfig::default().channel_capacity(0);

        assert_eq!(config.channel_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .channel_capacity(64)
            .delivery_mode(DeliveryMode::SkipWhenFull);

        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.delivery_mode, DeliveryMode::SkipWhenFull);
    }
}
