//! Doodad templates and their function groups

use doodad_core::{PhaseId, TemplateId};
use serde::{Deserialize, Serialize};

/// Kind of a function group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuncGroupKind {
    /// Initial phase of a freshly created doodad
    Start,
    /// Regular phase
    Normal,
    /// Auxiliary phase only reached through explicit transitions
    Extra,
}

impl Default for FuncGroupKind {
    fn default() -> Self {
        Self::Normal
    }
}

/// One phase of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncGroup {
    /// Phase id
    pub id: PhaseId,
    /// Group kind
    #[serde(default)]
    pub kind: FuncGroupKind,
}

impl FuncGroup {
    /// Create a new function group
    pub fn new(id: PhaseId, kind: FuncGroupKind) -> Self {
        Self { id, kind }
    }
}

/// Data-authored behaviour definition shared by every doodad of a type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoodadTemplate {
    /// Template id
    pub id: TemplateId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Function groups, in declaration order
    #[serde(default)]
    pub func_groups: Vec<FuncGroup>,
}

impl DoodadTemplate {
    /// Create an empty template
    pub fn new(id: TemplateId) -> Self {
        Self {
            id,
            name: String::new(),
            func_groups: Vec::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a function group
    pub fn with_group(mut self, id: PhaseId, kind: FuncGroupKind) -> Self {
        self.func_groups.push(FuncGroup::new(id, kind));
        self
    }

    /// Ids of every start-kind group, in declaration order
    pub fn start_func_groups(&self) -> Vec<PhaseId> {
        self.func_groups
            .iter()
            .filter(|g| g.kind == FuncGroupKind::Start)
            .map(|g| g.id)
            .collect()
    }

    /// Id of the first start-kind group, or 0 if there is none
    pub fn start_func_group(&self) -> PhaseId {
        self.func_groups
            .iter()
            .find(|g| g.kind == FuncGroupKind::Start)
            .map(|g| g.id)
            .unwrap_or(0)
    }

    /// Whether `phase` is one of this template's groups
    pub fn has_phase(&self, phase: PhaseId) -> bool {
        self.func_groups.iter().any(|g| g.id == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> DoodadTemplate {
        DoodadTemplate::new(100)
            .with_name("Apple Tree")
            .with_group(10, FuncGroupKind::Normal)
            .with_group(11, FuncGroupKind::Start)
            .with_group(12, FuncGroupKind::Start)
    }

    #[test]
    fn test_start_groups() {
        let template = tree();
        assert_eq!(template.start_func_groups(), vec![11, 12]);
        assert_eq!(template.start_func_group(), 11);
    }

    #[test]
    fn test_no_start_group() {
        let template = DoodadTemplate::new(1).with_group(5, FuncGroupKind::Normal);
        assert!(template.start_func_groups().is_empty());
        assert_eq!(template.start_func_group(), 0);
    }

    #[test]
    fn test_has_phase() {
        let template = tree();
        assert!(template.has_phase(10));
        assert!(!template.has_phase(99));
    }
}
