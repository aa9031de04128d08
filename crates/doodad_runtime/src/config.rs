//! Runtime Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `DOODAD_LOG`, `DOODAD_STORE`, `DOODAD_TEMPLATES`,
//!    `DOODAD_SCENARIO`, `DOODAD_SEED`, `DOODAD_MAX_DEPTH`
//! 2. Config file given on the command line
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! log_filter = "info,doodad_engine=debug"
//! store = "json:./data/doodads"
//! templates = "templates.json"
//! scenario = "scenario.toml"
//!
//! [engine]
//! loop_warning_interval = 10
//! max_recursion_depth = 256
//! rng_seed = 7
//! ```

use std::path::{Path, PathBuf};

use doodad_core::EngineConfig;
use doodad_store::StoreSpec;
use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// Complete runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Persistence backend
    pub store: StoreSpec,
    /// Template file (JSON)
    pub templates: Option<PathBuf>,
    /// Scenario file (TOML)
    pub scenario: Option<PathBuf>,
    /// Engine tuning
    pub engine: EngineConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            store: StoreSpec::Memory,
            templates: None,
            scenario: None,
            engine: EngineConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Parse from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, RuntimeError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a config file. Relative paths inside it resolve against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        for path in [&mut self.templates, &mut self.scenario].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let StoreSpec::Files { dir, .. } = &mut self.store {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }

    /// Apply `DOODAD_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), RuntimeError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), RuntimeError> {
        if let Some(filter) = lookup("DOODAD_LOG") {
            self.log_filter = filter;
        }
        if let Some(store) = lookup("DOODAD_STORE") {
            self.store = store.parse()?;
        }
        if let Some(templates) = lookup("DOODAD_TEMPLATES") {
            self.templates = Some(PathBuf::from(templates));
        }
        if let Some(scenario) = lookup("DOODAD_SCENARIO") {
            self.scenario = Some(PathBuf::from(scenario));
        }
        if let Some(seed) = lookup("DOODAD_SEED") {
            let seed = seed
                .parse()
                .map_err(|_| RuntimeError::Config(format!("DOODAD_SEED: invalid seed '{}'", seed)))?;
            self.engine.rng_seed = Some(seed);
        }
        if let Some(depth) = lookup("DOODAD_MAX_DEPTH") {
            self.engine.max_recursion_depth = match depth.as_str() {
                "none" | "unbounded" => None,
                value => Some(value.parse().map_err(|_| {
                    RuntimeError::Config(format!("DOODAD_MAX_DEPTH: invalid depth '{}'", value))
                })?),
            };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            log_filter = "debug"
            store = "binary:/var/lib/doodads"
            templates = "templates.json"

            [engine]
            max_recursion_depth = 64
            rng_seed = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.store.to_string(), "binary:/var/lib/doodads");
        assert_eq!(config.templates, Some(PathBuf::from("templates.json")));
        assert_eq!(config.scenario, None);
        assert_eq!(config.engine.max_recursion_depth, Some(64));
        assert_eq!(config.engine.rng_seed, Some(5));
        assert_eq!(config.engine.loop_warning_interval, 10);
    }

    #[test]
    fn test_defaults_from_empty_file() {
        assert_eq!(RuntimeConfig::from_toml_str("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("DOODAD_STORE", "json:/tmp/d"),
            ("DOODAD_SEED", "99"),
            ("DOODAD_MAX_DEPTH", "none"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.to_string(), "json:/tmp/d");
        assert_eq!(config.engine.rng_seed, Some(99));
        assert_eq!(config.engine.max_recursion_depth, None);
    }

    #[test]
    fn test_bad_seed_rejected() {
        let mut config = RuntimeConfig::default();
        let result = config.apply_overrides(|key| (key == "DOODAD_SEED").then(|| "x".to_string()));
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[test]
    fn test_relative_paths_resolved() {
        let mut config = RuntimeConfig::from_toml_str(
            r#"
            store = "json:data"
            templates = "t.json"
            scenario = "/abs/s.toml"
            "#,
        )
        .unwrap();
        config.resolve_relative_to(Path::new("/etc/doodad"));

        assert_eq!(config.templates, Some(PathBuf::from("/etc/doodad/t.json")));
        assert_eq!(config.scenario, Some(PathBuf::from("/abs/s.toml")));
        assert_eq!(config.store.to_string(), "json:/etc/doodad/data");
    }
}
