//! Engine configuration
//!
//! Built once at boot from the platform description and handed to
//! [`MessageEngine::new`](crate::MessageEngine::new).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::packet::WORD_SIZE;
use crate::types::AppId;

/// Boot-time settings of the message engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Payload alignment on the wire, in bytes (power of two)
    pub payload_align: usize,
    /// Emit telemetry records when observers are registered
    pub telemetry: bool,
    /// Application whose traffic is never reported to observers
    pub kernel_app: AppId,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payload_align: WORD_SIZE,
            telemetry: true,
            kernel_app: AppId::MANAGEMENT,
        }
    }
}

/// Configuration errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Payload alignment is zero or not a power of two
    #[error("payload alignment {0} is not a power of two")]
    BadAlignment(usize),
}

impl EngineConfig {
    /// Check the settings are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.payload_align.is_power_of_two() {
            return Err(ConfigError::BadAlignment(self.payload_align));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.payload_align, 4);
        assert!(config.telemetry);
        assert_eq!(config.kernel_app, AppId(0));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_alignment() {
        for align in [0, 3, 6] {
            let config = EngineConfig {
                payload_align: align,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::BadAlignment(align)));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "telemetry": false }"#).unwrap();
        assert!(!config.telemetry);
        assert_eq!(config.payload_align, 4);

        let config: EngineConfig =
            serde_json::from_str(r#"{ "payload_align": 8, "kernel_app": 2 }"#).unwrap();
        assert_eq!(config.payload_align, 8);
        assert_eq!(config.kernel_app, AppId(2));
    }
}
