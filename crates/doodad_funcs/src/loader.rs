//! JSON template loader
//!
//! ```json
//! {
//!   "templates": [{
//!     "id": 1000,
//!     "name": "Apple Tree",
//!     "groups": [{
//!       "id": 10,
//!       "kind": "Start",
//!       "phase_funcs": [{ "type": "DoodadFuncGrowth", "duration_ms": 60000 }],
//!       "triggers": [{ "type": "DoodadFuncUse", "skill_id": 3, "next_phase": 11 }]
//!     }]
//!   }]
//! }
//! ```
//!
//! Phase ids are global: two groups may not share an id, even across
//! templates.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use doodad_core::{PhaseId, TemplateId};
use doodad_engine::{DoodadTemplate, FuncGroupKind, MemoryCatalog};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::{PhaseDef, TriggerEntry};

/// Template loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON or unknown function type
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two templates share an id
    #[error("duplicate template id {0}")]
    DuplicateTemplate(TemplateId),
    /// Two function groups share an id
    #[error("function group {phase} of template {template} is already defined")]
    DuplicatePhase { template: TemplateId, phase: PhaseId },
    /// Phase id 0 is reserved for "no phase"
    #[error("template {0} declares function group 0")]
    ZeroPhase(TemplateId),
}

/// One function group as authored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDef {
    pub id: PhaseId,
    #[serde(default)]
    pub kind: FuncGroupKind,
    #[serde(default)]
    pub phase_funcs: Vec<PhaseDef>,
    #[serde(default)]
    pub triggers: Vec<TriggerEntry>,
}

/// One template as authored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDef {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
}

/// Top-level template file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateFile {
    #[serde(default)]
    pub templates: Vec<TemplateDef>,
}

/// Templates plus the catalog holding their functions
#[derive(Debug, Default)]
pub struct TemplateSet {
    pub templates: Vec<DoodadTemplate>,
    pub catalog: MemoryCatalog,
}

impl TemplateSet {
    /// Parse a template file
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let file: TemplateFile = serde_json::from_str(json)?;
        Self::build(file)
    }

    /// Load a template file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let set = Self::from_json_str(&content)?;
        log::info!(
            "Loaded {} doodad templates ({} function groups) from {}",
            set.templates.len(),
            set.catalog.phase_count(),
            path.display()
        );
        Ok(set)
    }

    /// Validate and convert authored templates
    pub fn build(file: TemplateFile) -> Result<Self, LoadError> {
        let mut set = TemplateSet::default();
        let mut seen_templates = HashSet::new();
        let mut seen_phases: HashMap<PhaseId, TemplateId> = HashMap::new();

        for def in file.templates {
            if !seen_templates.insert(def.id) {
                return Err(LoadError::DuplicateTemplate(def.id));
            }

            let mut template = DoodadTemplate::new(def.id).with_name(def.name);
            for group in def.groups {
                if group.id == 0 {
                    return Err(LoadError::ZeroPhase(def.id));
                }
                if seen_phases.insert(group.id, def.id).is_some() {
                    return Err(LoadError::DuplicatePhase {
                        template: def.id,
                        phase: group.id,
                    });
                }

                template = template.with_group(group.id, group.kind);
                for func in group.phase_funcs {
                    set.catalog.add_phase_func(group.id, func.build());
                }
                for entry in group.triggers {
                    set.catalog.add_trigger(group.id, entry.build());
                }
            }

            if template.start_func_groups().is_empty() {
                log::warn!("Template {} has no start function group", template.id);
            }
            set.templates.push(template);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_phase_rejected() {
        let json = r#"{ "templates": [
            { "id": 1, "groups": [{ "id": 10 }] },
            { "id": 2, "groups": [{ "id": 10 }] }
        ] }"#;
        assert!(matches!(
            TemplateSet::from_json_str(json),
            Err(LoadError::DuplicatePhase {
                template: 2,
                phase: 10
            })
        ));
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let json = r#"{ "templates": [{ "id": 1 }, { "id": 1 }] }"#;
        assert!(matches!(
            TemplateSet::from_json_str(json),
            Err(LoadError::DuplicateTemplate(1))
        ));
    }

    #[test]
    fn test_zero_phase_rejected() {
        let json = r#"{ "templates": [{ "id": 3, "groups": [{ "id": 0 }] }] }"#;
        assert!(matches!(
            TemplateSet::from_json_str(json),
            Err(LoadError::ZeroPhase(3))
        ));
    }

    #[test]
    fn test_unknown_function_type() {
        let json = r#"{ "templates": [{ "id": 3, "groups": [
            { "id": 1, "triggers": [{ "type": "DoodadFuncTeleport" }] }
        ] }] }"#;
        assert!(matches!(
            TemplateSet::from_json_str(json),
            Err(LoadError::Parse(_))
        ));
    }
}
