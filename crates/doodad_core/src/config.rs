//! Engine configuration
//!
//! ```toml
//! loop_warning_interval = 10   # warn every N recursive re-entries
//! max_recursion_depth = 256    # abort the transition chain past this depth
//! rng_seed = 1234              # deterministic phase ratio rolls
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Tuning for the phase execution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Emit a loop-risk warning every this many recursive re-entries
    pub loop_warning_interval: u32,
    /// Hard cap on the transition chain depth. `None` disables the cap
    pub max_recursion_depth: Option<u32>,
    /// Seed for phase ratio rolls. `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            loop_warning_interval: 10,
            max_recursion_depth: Some(256),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Set a deterministic seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Set the hard recursion cap
    pub fn with_max_recursion_depth(mut self, depth: Option<u32>) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// Parse from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Whether a loop-risk warning is due at `depth`
    pub fn warn_at(&self, depth: u32) -> bool {
        self.loop_warning_interval > 0 && depth % self.loop_warning_interval == 0
    }

    /// Whether `depth` exceeds the hard cap
    pub fn exceeds_limit(&self, depth: u32) -> bool {
        self.max_recursion_depth.map_or(false, |max| depth > max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.loop_warning_interval, 10);
        assert_eq!(config.max_recursion_depth, Some(256));
        assert!(config.warn_at(10));
        assert!(config.warn_at(20));
        assert!(!config.warn_at(11));
        assert!(!config.exceeds_limit(256));
        assert!(config.exceeds_limit(257));
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            loop_warning_interval = 5
            rng_seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.loop_warning_interval, 5);
        assert_eq!(config.rng_seed, Some(42));
        // Missing keys fall back to defaults
        assert_eq!(config.max_recursion_depth, Some(256));
    }

    #[test]
    fn test_config_errors_are_not_persistence_errors() {
        let result = EngineConfig::from_toml_str("loop_warning_interval = \"often\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        let result = EngineConfig::load("/nonexistent/doodad/engine.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_zero_interval_never_warns() {
        let config = EngineConfig {
            loop_warning_interval: 0,
            ..Default::default()
        };
        assert!(!config.warn_at(0));
        assert!(!config.warn_at(10));
    }

    #[test]
    fn test_unbounded() {
        let config = EngineConfig::default().with_max_recursion_depth(None);
        assert!(!config.exceeds_limit(u32::MAX));
    }
}
