//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of consecutive dirty passes a cycle may run before it is abandoned.
pub const DEFAULT_TTL: usize = 10;

/// Configuration for a [`Scope`](crate::Scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeConfig {
    /// Dirty-pass budget for one `run_cycle` call.
    pub ttl: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl ScopeConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        Ok(())
    }
}
