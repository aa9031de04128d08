//! # doodad_core - Doodad Engine Core
//!
//! Shared primitives for every crate in the doodad phase engine:
//! - **Identifiers**: in-world object ids, template/phase/persistent id aliases
//!   and the durable id allocator seam
//! - **Errors**: the fault taxonomy used across the engine
//! - **Clock**: an injectable notion of "now"
//! - **Config**: engine tuning loaded from TOML

pub mod clock;
pub mod config;
pub mod error;
pub mod id;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::EngineConfig;
    pub use crate::error::{ConfigError, EngineError, FuncError, PersistError, WorldError};
    pub use crate::id::{
        CharacterId, IdAllocator, ObjectId, PersistentId, PhaseId, PhaseTarget, SequentialIds,
        TemplateId,
    };
}
