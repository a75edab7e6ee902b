//! Heartbeat configuration for the liveness system
//!
//! The heartbeat is the maintenance cadence at which blinks are rolled and
//! gaze jitter is redrawn. It runs independently of the render cadence.

use std::time::Duration;
use visage_core::LivenessConfig;

/// Configuration for the liveness heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to run a maintenance tick (default: 100ms, i.e. 10 Hz)
    pub interval: Duration,
    /// Chance per tick that a blink starts (default: 0.05)
    pub blink_probability: f64,
    /// How long the eyes stay shut once a blink starts (default: 150ms)
    pub blink_hold: Duration,
    /// Jitter is drawn from `[-jitter_range, jitter_range]` (default: 1.0)
    pub jitter_range: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            blink_probability: 0.05,
            blink_hold: Duration::from_millis(150),
            jitter_range: 1.0,
        }
    }
}

impl HeartbeatConfig {
    /// Very fast heartbeat for testing
    pub fn testing() -> Self {
        Self {
            interval: Duration::from_millis(10),
            ..Self::default()
        }
    }
}

impl From<&LivenessConfig> for HeartbeatConfig {
    fn from(cfg: &LivenessConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.interval_ms.max(1)),
            blink_probability: cfg.blink_probability,
            blink_hold: Duration::from_millis(cfg.blink_hold_ms),
            jitter_range: cfg.jitter_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_ten_hertz() {
        let cfg = HeartbeatConfig::default();
        assert_eq!(cfg.interval, Duration::from_millis(100));
        assert_eq!(cfg.blink_hold, Duration::from_millis(150));
    }

    #[test]
    fn test_from_liveness_config() {
        let cfg = HeartbeatConfig::from(&LivenessConfig {
            interval_ms: 0,
            blink_probability: 0.2,
            blink_hold_ms: 90,
            jitter_range: 0.5,
        });
        // A zero interval would make tokio::time::interval panic
        assert_eq!(cfg.interval, Duration::from_millis(1));
        assert_eq!(cfg.blink_hold, Duration::from_millis(90));
        assert_eq!(cfg.jitter_range, 0.5);
    }
}
