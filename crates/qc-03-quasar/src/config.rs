//! Configuration types for the Quasar certifier

use crate::error::{QuasarError, QuasarResult};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

/// Default precomputed-material pool size.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Default refill tick.
pub const DEFAULT_PRECOMPUTE_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime configuration for the certifier
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuasarConfig {
    /// Shares required to aggregate a certificate.
    pub threshold: usize,

    /// Default bound on a certificate wait.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,

    /// Precomputed-material pool size.
    pub pool_capacity: usize,

    /// Refill tick; one item is generated per tick while below capacity.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub precompute_interval: Duration,

    /// Fill the pool synchronously at construction.
    pub prefill: bool,
}

impl Default for QuasarConfig {
    fn default() -> Self {
        Self {
            threshold: 15,
            timeout: Duration::from_millis(50),
            pool_capacity: DEFAULT_POOL_CAPACITY,
            precompute_interval: DEFAULT_PRECOMPUTE_INTERVAL,
            prefill: false,
        }
    }
}

impl QuasarConfig {
    pub fn validate(&self) -> QuasarResult<()> {
        if self.threshold == 0 {
            return Err(QuasarError::InvalidConfig("threshold must be positive".into()));
        }
        if self.pool_capacity == 0 {
            return Err(QuasarError::InvalidConfig(
                "pool_capacity must be positive".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(QuasarError::InvalidConfig("timeout must be positive".into()));
        }
        if self.precompute_interval.is_zero() {
            return Err(QuasarError::InvalidConfig(
                "precompute_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        QuasarConfig::default().validate().unwrap();
        assert_eq!(QuasarConfig::default().pool_capacity, 64);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = QuasarConfig {
            threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(QuasarError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: QuasarConfig =
            serde_json::from_str(r#"{"threshold": 3, "timeout": 250}"#).unwrap();
        assert_eq!(config.threshold, 3);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.precompute_interval, DEFAULT_PRECOMPUTE_INTERVAL);
    }
}
