//! Configuration types for the Beam engine

use crate::error::{EngineError, EngineResult};
use qc_02_topological::Parameters;
use qc_03_quasar::QuasarConfig;
use serde::{Deserialize, Serialize};

/// Default inbound queue depth.
pub const DEFAULT_INBOUND_CAPACITY: usize = 1000;

/// Default outbound queue depth.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1000;

/// Default slash channel depth.
pub const DEFAULT_SLASH_CAPACITY: usize = 10;

/// Runtime configuration for the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Consensus parameters.
    pub params: Parameters,

    /// Require dual certificates on built and received blocks.
    pub quasar_enabled: bool,

    /// Certifier settings. `threshold` is the Ringtail threshold and
    /// `timeout` bounds the certificate wait in `build_block`.
    pub quasar: QuasarConfig,

    pub inbound_capacity: usize,
    pub outbound_capacity: usize,
    pub slash_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            params: Parameters::default(),
            quasar_enabled: false,
            quasar: QuasarConfig::default(),
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            slash_capacity: DEFAULT_SLASH_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.params.validate()?;
        if self.quasar_enabled {
            self.quasar.validate()?;
        }
        for (name, value) in [
            ("inbound_capacity", self.inbound_capacity),
            ("outbound_capacity", self.outbound_capacity),
            ("slash_capacity", self.slash_capacity),
        ] {
            if value == 0 {
                return Err(EngineError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qc_02_topological::ParamsError;
    use qc_03_quasar::QuasarError;

    #[test]
    fn test_default_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut config = EngineConfig::default();
        config.params.beta = 0;
        assert_eq!(
            config.validate(),
            Err(EngineError::Params(ParamsError::InvalidBeta))
        );
    }

    #[test]
    fn test_quasar_checked_only_when_enabled() {
        let mut config = EngineConfig::default();
        config.quasar.threshold = 0;
        config.validate().unwrap();

        config.quasar_enabled = true;
        assert!(matches!(
            config.validate(),
            Err(EngineError::Quasar(QuasarError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = EngineConfig {
            outbound_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"quasar_enabled": true, "quasar": {"threshold": 3, "timeout": 200}}"#,
        )
        .unwrap();
        assert!(config.quasar_enabled);
        assert_eq!(config.quasar.threshold, 3);
        assert_eq!(config.inbound_capacity, DEFAULT_INBOUND_CAPACITY);
        assert_eq!(config.params, Parameters::default());
    }
}
