use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPEN_SETTLE_MS: u64 = 1000;
pub const DEFAULT_TYPE_SETTLE_MS: u64 = 500;
pub const DEFAULT_KEY_INTERVAL_MS: u64 = 50;
pub const DEFAULT_FAILSAFE_INTERVAL_MS: u64 = 100;
pub const DEFAULT_FAILSAFE_MARGIN: f64 = 4.0;

/// Timing used by the built-in handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Delay between launching an application and trying to focus its window.
    pub open_settle_ms: u64,
    /// Delay before the first keystroke of `type`, so the target can take focus.
    pub type_settle_ms: u64,
    /// Delay between two keystrokes.
    pub key_interval_ms: u64,
    /// Log plugin programs instead of running them.
    pub dry_run: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            open_settle_ms: DEFAULT_OPEN_SETTLE_MS,
            type_settle_ms: DEFAULT_TYPE_SETTLE_MS,
            key_interval_ms: DEFAULT_KEY_INTERVAL_MS,
            dry_run: false,
        }
    }
}

impl ExecutorConfig {
    /// No settle delays and no keystroke pacing.
    pub fn immediate() -> Self {
        Self {
            open_settle_ms: 0,
            type_settle_ms: 0,
            key_interval_ms: 0,
            dry_run: false,
        }
    }

    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms)
    }

    pub fn type_settle(&self) -> Duration {
        Duration::from_millis(self.type_settle_ms)
    }

    pub fn key_interval(&self) -> Duration {
        Duration::from_millis(self.key_interval_ms)
    }
}

/// Pointer-in-corner abort watchdog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig {
    pub enabled: bool,
    /// Sampling period of the pointer position.
    pub interval_ms: u64,
    /// Distance in pixels from a screen corner that counts as "in the corner".
    pub margin: f64,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_FAILSAFE_INTERVAL_MS,
            margin: DEFAULT_FAILSAFE_MARGIN,
        }
    }
}

impl FailsafeConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub executor: ExecutorConfig,
    pub failsafe: FailsafeConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"executor": {"key_interval_ms": 10}}"#).unwrap();
        assert_eq!(config.executor.key_interval(), Duration::from_millis(10));
        assert_eq!(
            config.executor.open_settle(),
            Duration::from_millis(DEFAULT_OPEN_SETTLE_MS)
        );
        assert!(config.failsafe.enabled);
        assert_eq!(config.failsafe.interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = FailsafeConfig {
            interval_ms: 0,
            ..FailsafeConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_millis(1));
    }
}
