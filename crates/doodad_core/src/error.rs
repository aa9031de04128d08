//! Error types shared by the engine crates

use crate::id::{ObjectId, PersistentId, TemplateId};
use thiserror::Error;

/// A data-authored function failed while executing
#[derive(Debug, Error)]
pub enum FuncError {
    /// The function reported a failure
    #[error("function failed: {0}")]
    Failed(String),
    /// The function panicked
    #[error("function panicked: {0}")]
    Panicked(String),
    /// A save issued from inside the function failed
    #[error("persistence failed inside function: {0}")]
    Persist(#[from] PersistError),
}

impl FuncError {
    /// Shorthand for [`FuncError::Failed`]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Durable save/delete errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(PersistentId),
    /// A persistent object has no gateway to save through
    #[error("object {0} is persistent but not bound to a persistence gateway")]
    Unbound(ObjectId),
    /// Storage backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Engine configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// Config file is not valid TOML for the engine settings
    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors escaping the phase engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Persistence failed; never swallowed by the engine
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The transition chain exceeded the configured depth
    #[error("doodad {object} (template {template}) exceeded recursion limit at depth {depth}")]
    RecursionLimit {
        object: ObjectId,
        template: TemplateId,
        depth: u32,
    },
}

/// World-level refusals and lookup failures
#[derive(Debug, Error)]
pub enum WorldError {
    /// Object is not in the world
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    /// A persistent object is stacked on top of the target
    #[error("removal of {0} refused: persistent objects are attached to it")]
    RemovalRefused(ObjectId),
    /// Object id already in use
    #[error("object {0} is already present")]
    AlreadyPresent(ObjectId),
    /// Attaching would make an object its own ancestor
    #[error("attaching {child} to {parent} would create a cycle")]
    CyclicAttachment { child: ObjectId, parent: ObjectId },
    /// Engine failure while operating on a world object
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<PersistError> for WorldError {
    fn from(e: PersistError) -> Self {
        WorldError::Engine(EngineError::Persist(e))
    }
}
