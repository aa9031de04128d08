//! # doodad_engine - Phase Execution Engine
//!
//! Drives interactive world objects ("doodads") through the phases their
//! templates define.
//!
//! # Features
//!
//! - First-match trigger dispatch (`use_doodad`)
//! - Phase-entry cascades through override requests (`do_phase`)
//! - Transition-and-reuse chains with a loop-risk heartbeat and a hard depth cap
//! - Skill-hit dispatch, deletion and a world container enforcing stacking safety
//! - Fault containment for data-authored functions
//!
//! # Example
//!
//! ```ignore
//! use doodad_engine::prelude::*;
//!
//! let catalog = MemoryCatalog::new().with_trigger(
//!     5,
//!     TriggerFunc::from_fn("DoodadFuncUse", |_| Ok(())).with_next_phase(PhaseTarget::Phase(7)),
//! );
//! let engine = PhaseEngine::new(Arc::new(catalog), Arc::new(NullBroadcaster));
//! engine.use_doodad(&mut doodad, Some(actor), 3)?;
//! ```

pub mod actor;
pub mod catalog;
pub mod doodad;
pub mod func;
pub mod observer;
pub mod persist;
pub mod phase;
pub mod seat;
pub mod template;
pub mod world;

pub use actor::*;
pub use catalog::*;
pub use doodad::*;
pub use func::*;
pub use observer::*;
pub use persist::*;
pub use phase::*;
pub use seat::*;
pub use template::*;
pub use world::*;

pub mod prelude {
    pub use crate::actor::Actor;
    pub use crate::catalog::{FuncGroupCatalog, MemoryCatalog};
    pub use crate::doodad::{AttachPoint, Doodad, DoodadKind, DoodadOwnerType};
    pub use crate::func::{DoodadFunc, FuncContext, PhaseFunc, TriggerFunc, SKILL_HIT_FUNC_TYPE};
    pub use crate::observer::{NullBroadcaster, ObserverBroadcaster};
    pub use crate::persist::{DoodadRecord, Persistence, PersistenceGateway};
    pub use crate::phase::PhaseEngine;
    pub use crate::template::{DoodadTemplate, FuncGroupKind};
    pub use crate::world::{DoodadWorld, SharedWorld};
    pub use doodad_core::prelude::*;
}
