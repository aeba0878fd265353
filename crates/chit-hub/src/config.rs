//! Hub configuration.

/// Channel sizes for the hub and its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of the hub's command channel. When full, callers wait for
    /// the loop to catch up.
    pub command_capacity: usize,

    /// Capacity of each connection's outbound queue. A connection whose
    /// queue is full when a frame arrives is dropped.
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            command_capacity: 256,
            outbound_capacity: 256,
        }
    }
}

impl HubConfig {
    /// Returns a copy with zero capacities raised to 1.
    ///
    /// Tokio panics on a zero-capacity channel.
    pub fn validated(mut self) -> Self {
        if self.command_capacity == 0 {
            tracing::warn!("command_capacity is 0, using 1");
            self.command_capacity = 1;
        }
        if self.outbound_capacity == 0 {
            tracing::warn!("outbound_capacity is 0, using 1");
            self.outbound_capacity = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_default() {
        let config = HubConfig::default();
        assert_eq!(config.command_capacity, 256);
        assert_eq!(config.outbound_capacity, 256);
    }

    #[test]
    fn test_validated_raises_zero_capacities() {
        let config = HubConfig {
            command_capacity: 0,
            outbound_capacity: 0,
        }
        .validated();
        assert_eq!(config.command_capacity, 1);
        assert_eq!(config.outbound_capacity, 1);
    }

    #[test]
    fn test_validated_keeps_valid_config() {
        let config = HubConfig {
            command_capacity: 8,
            outbound_capacity: 2,
        };
        assert_eq!(config.validated(), config);
    }
}
