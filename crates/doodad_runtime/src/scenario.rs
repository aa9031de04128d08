//! Scenario files: which doodads to spawn and what to do with them
//!
//! ```toml
//! [[spawn]]
//! name = "tree"
//! template = 1000
//! position = [10.0, 0.0, 4.5]
//! owner = 77
//! persistent = true
//! observers = [77, 80]
//!
//! [[step]]
//! action = "use"
//! target = "tree"
//! skill = 3
//! actor = 77
//!
//! [[step]]
//! action = "advance"
//! ms = 60000
//! ```

use std::path::Path;

use doodad_core::{CharacterId, TemplateId};
use serde::{Deserialize, Serialize};

use crate::RuntimeError;

/// A doodad placed at scenario start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDef {
    /// Name used by steps to refer to the object
    pub name: String,
    pub template: TemplateId,
    #[serde(default)]
    pub position: [f32; 3],
    /// Heading in degrees
    #[serde(default)]
    pub yaw: f32,
    /// Owning character, if any
    #[serde(default)]
    pub owner: Option<CharacterId>,
    #[serde(default)]
    pub persistent: bool,
    /// Name of the object to stack this one on
    #[serde(default)]
    pub parent: Option<String>,
    /// Characters that can see the object
    #[serde(default)]
    pub observers: Vec<CharacterId>,
}

/// One scripted stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Interact with an object
    Use {
        target: String,
        #[serde(default)]
        skill: u32,
        #[serde(default)]
        actor: Option<CharacterId>,
    },
    /// Strike an object with an effect
    SkillHit {
        target: String,
        skill: u32,
        #[serde(default)]
        caster: Option<CharacterId>,
    },
    /// Force a phase; -1 deletes
    GoToPhase { target: String, phase: i32 },
    /// Remove an object from the world
    Remove { target: String },
    /// Show an object to a character
    Show { target: String, character: CharacterId },
    /// Hide an object from a character
    Hide { target: String, character: CharacterId },
    /// Move the simulation clock forward
    Advance { ms: u32 },
}

impl Step {
    /// Object the step acts on, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Use { target, .. }
            | Self::SkillHit { target, .. }
            | Self::GoToPhase { target, .. }
            | Self::Remove { target }
            | Self::Show { target, .. }
            | Self::Hide { target, .. } => Some(target),
            Self::Advance { .. } => None,
        }
    }
}

/// Complete scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub spawn: Vec<SpawnDef>,
    #[serde(default)]
    pub step: Vec<Step>,
}

impl Scenario {
    /// Parse from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, RuntimeError> {
        let scenario: Self = toml::from_str(s)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Every name is unique and every reference points at an earlier spawn
    fn validate(&self) -> Result<(), RuntimeError> {
        let mut names: Vec<&str> = Vec::with_capacity(self.spawn.len());
        for spawn in &self.spawn {
            if names.contains(&spawn.name.as_str()) {
                return Err(RuntimeError::Scenario(format!(
                    "doodad '{}' is spawned twice",
                    spawn.name
                )));
            }
            if let Some(parent) = &spawn.parent {
                if !names.contains(&parent.as_str()) {
                    return Err(RuntimeError::Scenario(format!(
                        "parent '{}' of '{}' must be spawned first",
                        parent, spawn.name
                    )));
                }
            }
            names.push(&spawn.name);
        }

        for step in &self.step {
            if let Some(target) = step.target() {
                if !names.contains(&target) {
                    return Err(RuntimeError::Scenario(format!(
                        "step {:?} targets unknown doodad '{}'",
                        step, target
                    )));
                }
            }
        }
        Ok(())
    }
}
