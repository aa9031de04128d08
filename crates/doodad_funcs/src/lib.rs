//! # doodad_funcs - Doodad Function Library
//!
//! Built-in trigger and phase-entry functions, and a JSON loader that turns
//! authored templates into [`DoodadTemplate`]s plus a [`MemoryCatalog`].
//!
//! [`DoodadTemplate`]: doodad_engine::DoodadTemplate
//! [`MemoryCatalog`]: doodad_engine::MemoryCatalog

pub mod library;
pub mod loader;

pub use library::*;
pub use loader::*;

pub mod prelude {
    pub use crate::library::{PhaseDef, TriggerDef, TriggerEntry};
    pub use crate::loader::{LoadError, TemplateFile, TemplateSet};
}
