use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::membrane::error::{MembraneError, Result};

/// Arrays nested deeper than this cross the boundary as proxies instead of copies.
pub const DEFAULT_ARRAY_DEPTH_LIMIT: usize = 16;

/// Tunables of a membrane that are not callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MembraneConfig {
    /// Live-target policy used when no `liveTargetCallback` is supplied.
    #[serde(default)]
    pub live_targets: bool,

    /// Maximum nesting depth of arrays rebuilt in the destination realm.
    #[serde(default = "default_array_depth_limit")]
    pub array_depth_limit: usize,

    /// Emit a `trace!` event for every proxy trap.
    #[serde(default)]
    pub trace_traps: bool,

    /// Evaluate red source as strict code.
    #[serde(default)]
    pub strict_evaluation: bool,
}

fn default_array_depth_limit() -> usize {
    DEFAULT_ARRAY_DEPTH_LIMIT
}

impl Default for MembraneConfig {
    fn default() -> Self {
        Self {
            live_targets: false,
            array_depth_limit: default_array_depth_limit(),
            trace_traps: false,
            strict_evaluation: false,
        }
    }
}

impl MembraneConfig {
    /// Parses a TOML document; absent keys take their defaults.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| MembraneError::InvalidOptions(e.to_string()))?;
        if config.array_depth_limit == 0 {
            return Err(MembraneError::InvalidOptions(
                "array_depth_limit must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load config from file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MembraneError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), ?config, "loaded membrane config");
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MembraneError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(MembraneConfig::parse("").unwrap(), MembraneConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let config = MembraneConfig::parse(
            "live_targets = true\narray_depth_limit = 2\ntrace_traps = true\nstrict_evaluation = true\n",
        )
        .unwrap();
        assert!(config.live_targets);
        assert_eq!(config.array_depth_limit, 2);
        assert!(config.trace_traps);
        assert!(config.strict_evaluation);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(matches!(
            MembraneConfig::parse("liveTargets = true"),
            Err(MembraneError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        assert!(matches!(
            MembraneConfig::parse("array_depth_limit = 0"),
            Err(MembraneError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = MembraneConfig {
            live_targets: true,
            ..MembraneConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(MembraneConfig::parse(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MembraneConfig::load(Path::new("/nonexistent/membrane.toml")),
            Err(MembraneError::Config(_))
        ));
    }
}
