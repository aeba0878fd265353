//! Heartbeat and read-limit settings for each connection.

use std::time::Duration;

use chit_transport::ReadLimits;

/// Liveness timing for one connection.
///
/// Must satisfy `write_timeout < ping_interval < peer_timeout`: the peer's
/// pong has to land before its read window closes, and a wedged write has
/// to fail before the next ping is due. Use [`validated`](Self::validated)
/// to repair a config that doesn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Deadline for writing one frame (or ping, or close).
    pub write_timeout: Duration,

    /// How often the outbound loop pings.
    pub ping_interval: Duration,

    /// How long the peer may stay silent before the inbound loop gives up.
    pub peer_timeout: Duration,

    /// Largest inbound message accepted, in bytes.
    pub max_message_size: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            write_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(54),
            peer_timeout: Duration::from_secs(60),
            max_message_size: 512,
        }
    }
}

impl HeartbeatConfig {
    /// Fixes any values that break the ordering so the config is safe to
    /// use. Rules:
    /// - zero `peer_timeout` or `max_message_size` fall back to defaults.
    /// - `ping_interval` ≥ `peer_timeout` becomes 9/10 of `peer_timeout`.
    /// - `write_timeout` ≥ `ping_interval` becomes half of `ping_interval`.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.peer_timeout.is_zero() {
            tracing::warn!("peer_timeout is zero, using default");
            self.peer_timeout = defaults.peer_timeout;
        }
        if self.max_message_size == 0 {
            tracing::warn!("max_message_size is zero, using default");
            self.max_message_size = defaults.max_message_size;
        }
        if self.ping_interval.is_zero() || self.ping_interval >= self.peer_timeout {
            let repaired = self.peer_timeout * 9 / 10;
            tracing::warn!(
                ping_interval = ?self.ping_interval,
                peer_timeout = ?self.peer_timeout,
                repaired = ?repaired,
                "ping_interval must be shorter than peer_timeout"
            );
            self.ping_interval = repaired;
        }
        if self.write_timeout.is_zero() || self.write_timeout >= self.ping_interval {
            let repaired = self.ping_interval / 2;
            tracing::warn!(
                write_timeout = ?self.write_timeout,
                ping_interval = ?self.ping_interval,
                repaired = ?repaired,
                "write_timeout must be shorter than ping_interval"
            );
            self.write_timeout = repaired;
        }
        self
    }

    /// The limits handed to a connection's read half.
    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            idle_timeout: self.peer_timeout,
            max_message_size: self.max_message_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_default_is_ordered() {
        let cfg = HeartbeatConfig::default();
        assert!(cfg.write_timeout < cfg.ping_interval);
        assert!(cfg.ping_interval < cfg.peer_timeout);
        assert_eq!(cfg.ping_interval, cfg.peer_timeout * 9 / 10);
        assert_eq!(cfg.max_message_size, 512);
    }

    #[test]
    fn test_validated_keeps_valid_config() {
        let cfg = HeartbeatConfig::default();
        assert_eq!(cfg.validated(), cfg);
    }

    #[test]
    fn test_validated_ping_not_below_peer_timeout_is_repaired() {
        let cfg = HeartbeatConfig {
            ping_interval: secs(60),
            ..HeartbeatConfig::default()
        }
        .validated();
        assert_eq!(cfg.ping_interval, secs(54));
    }

    #[test]
    fn test_validated_write_timeout_not_below_ping_is_repaired() {
        let cfg = HeartbeatConfig {
            write_timeout: secs(30),
            ping_interval: secs(20),
            peer_timeout: secs(30),
            max_message_size: 512,
        }
        .validated();
        assert_eq!(cfg.write_timeout, secs(10));
        assert!(cfg.write_timeout < cfg.ping_interval);
    }

    #[test]
    fn test_validated_zero_values_fall_back() {
        let cfg = HeartbeatConfig {
            write_timeout: Duration::ZERO,
            ping_interval: Duration::ZERO,
            peer_timeout: Duration::ZERO,
            max_message_size: 0,
        }
        .validated();
        assert_eq!(cfg.peer_timeout, secs(60));
        assert_eq!(cfg.ping_interval, secs(54));
        assert_eq!(cfg.write_timeout, secs(27));
        assert_eq!(cfg.max_message_size, 512);
    }

    #[test]
    fn test_read_limits_follow_peer_timeout() {
        let limits = HeartbeatConfig::default().read_limits();
        assert_eq!(limits.idle_timeout, secs(60));
        assert_eq!(limits.max_message_size, 512);
    }
}
