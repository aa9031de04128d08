//! Data-authored doodad functions
//!
//! A phase owns two ordered lists of functions:
//! - **trigger functions**, fired by an interaction whose skill matches
//! - **phase-entry functions**, fired as soon as the phase is entered
//!
//! What a function actually does is defined elsewhere; the engine only needs
//! the metadata here and a way to execute it against a doodad.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use doodad_core::{FuncError, PhaseTarget};

use crate::actor::Actor;
use crate::doodad::Doodad;

/// Type tag of functions that react to a doodad being struck by an effect
pub const SKILL_HIT_FUNC_TYPE: &str = "DoodadFuncSkillHit";

/// Everything a function sees while executing
pub struct FuncContext<'a> {
    /// Unit driving the interaction, if any
    pub actor: Option<Actor>,
    /// The doodad the function runs against
    pub doodad: &'a mut Doodad,
    /// Triggering skill/action id
    pub skill_id: u32,
    /// Declared destination of a trigger function. Always `None` for
    /// phase-entry functions
    pub next_phase: Option<PhaseTarget>,
    /// Current time
    pub now: DateTime<Utc>,
}

/// Executable behaviour behind a function entry
pub trait DoodadFunc: Send + Sync {
    /// Run the function
    fn execute(&self, ctx: &mut FuncContext<'_>) -> Result<(), FuncError>;
}

impl<F> DoodadFunc for F
where
    F: Fn(&mut FuncContext<'_>) -> Result<(), FuncError> + Send + Sync,
{
    fn execute(&self, ctx: &mut FuncContext<'_>) -> Result<(), FuncError> {
        self(ctx)
    }
}

/// A function fired in response to an interaction
#[derive(Clone)]
pub struct TriggerFunc {
    /// Skill that triggers this function. 0 matches any interaction
    pub skill_id: u32,
    /// Function type tag
    pub func_type: String,
    /// Declared destination phase
    pub next_phase: Option<PhaseTarget>,
    behavior: Arc<dyn DoodadFunc>,
}

impl TriggerFunc {
    /// Create a trigger function
    pub fn new(func_type: impl Into<String>, behavior: impl DoodadFunc + 'static) -> Self {
        Self {
            skill_id: 0,
            func_type: func_type.into(),
            next_phase: None,
            behavior: Arc::new(behavior),
        }
    }

    /// Create a trigger function from a closure
    pub fn from_fn<F>(func_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut FuncContext<'_>) -> Result<(), FuncError> + Send + Sync + 'static,
    {
        Self::new(func_type, f)
    }

    /// Only fire for this skill
    pub fn with_skill(mut self, skill_id: u32) -> Self {
        self.skill_id = skill_id;
        self
    }

    /// Declare the destination phase
    pub fn with_next_phase(mut self, next: PhaseTarget) -> Self {
        self.next_phase = Some(next);
        self
    }

    /// Declare the destination from a raw template value
    pub fn with_raw_next_phase(mut self, raw: i32) -> Self {
        self.next_phase = PhaseTarget::from_raw(raw);
        self
    }

    /// Whether this function reacts to `skill_id`
    pub fn matches(&self, skill_id: u32) -> bool {
        self.skill_id == 0 || self.skill_id == skill_id
    }

    /// Whether this is a skill-hit function
    pub fn is_skill_hit(&self) -> bool {
        self.func_type == SKILL_HIT_FUNC_TYPE
    }

    /// Run the function
    pub fn execute(&self, ctx: &mut FuncContext<'_>) -> Result<(), FuncError> {
        self.behavior.execute(ctx)
    }
}

impl fmt::Debug for TriggerFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerFunc")
            .field("skill_id", &self.skill_id)
            .field("func_type", &self.func_type)
            .field("next_phase", &self.next_phase)
            .finish()
    }
}

/// A function fired when its phase is entered
#[derive(Clone)]
pub struct PhaseFunc {
    /// Function type tag
    pub func_type: String,
    behavior: Arc<dyn DoodadFunc>,
}

impl PhaseFunc {
    /// Create a phase-entry function
    pub fn new(func_type: impl Into<String>, behavior: impl DoodadFunc + 'static) -> Self {
        Self {
            func_type: func_type.into(),
            behavior: Arc::new(behavior),
        }
    }

    /// Create a phase-entry function from a closure
    pub fn from_fn<F>(func_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut FuncContext<'_>) -> Result<(), FuncError> + Send + Sync + 'static,
    {
        Self::new(func_type, f)
    }

    /// Run the function
    pub fn execute(&self, ctx: &mut FuncContext<'_>) -> Result<(), FuncError> {
        self.behavior.execute(ctx)
    }
}

impl fmt::Debug for PhaseFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseFunc")
            .field("func_type", &self.func_type)
            .finish()
    }
}
