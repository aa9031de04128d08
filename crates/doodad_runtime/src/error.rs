//! Runtime errors

use doodad_core::{PersistError, WorldError};
use doodad_funcs::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid scenario: {0}")]
    Scenario(String),
    #[error("Template error: {0}")]
    Templates(#[from] LoadError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    World(#[from] WorldError),
}
