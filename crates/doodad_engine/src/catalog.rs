//! Function group lookup

use std::collections::HashMap;

use doodad_core::PhaseId;

use crate::func::{PhaseFunc, TriggerFunc};

/// Resolves the functions that belong to a phase
pub trait FuncGroupCatalog: Send + Sync {
    /// Trigger functions of `phase`, in declared order
    fn trigger_funcs(&self, phase: PhaseId) -> Vec<TriggerFunc>;

    /// Phase-entry functions of `phase`, in declared order
    fn phase_funcs(&self, phase: PhaseId) -> Vec<PhaseFunc>;
}

/// In-memory catalog keyed by phase id
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    triggers: HashMap<PhaseId, Vec<TriggerFunc>>,
    entries: HashMap<PhaseId, Vec<PhaseFunc>>,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a trigger function to `phase`
    pub fn add_trigger(&mut self, phase: PhaseId, func: TriggerFunc) {
        self.triggers.entry(phase).or_default().push(func);
    }

    /// Append a phase-entry function to `phase`
    pub fn add_phase_func(&mut self, phase: PhaseId, func: PhaseFunc) {
        self.entries.entry(phase).or_default().push(func);
    }

    /// Builder form of [`MemoryCatalog::add_trigger`]
    pub fn with_trigger(mut self, phase: PhaseId, func: TriggerFunc) -> Self {
        self.add_trigger(phase, func);
        self
    }

    /// Builder form of [`MemoryCatalog::add_phase_func`]
    pub fn with_phase_func(mut self, phase: PhaseId, func: PhaseFunc) -> Self {
        self.add_phase_func(phase, func);
        self
    }

    /// Merge another catalog into this one, appending after existing entries
    pub fn merge(&mut self, other: MemoryCatalog) {
        for (phase, funcs) in other.triggers {
            self.triggers.entry(phase).or_default().extend(funcs);
        }
        for (phase, funcs) in other.entries {
            self.entries.entry(phase).or_default().extend(funcs);
        }
    }

    /// Number of phases with at least one function
    pub fn phase_count(&self) -> usize {
        let mut phases: Vec<_> = self.triggers.keys().chain(self.entries.keys()).collect();
        phases.sort_unstable();
        phases.dedup();
        phases.len()
    }
}

impl FuncGroupCatalog for MemoryCatalog {
    fn trigger_funcs(&self, phase: PhaseId) -> Vec<TriggerFunc> {
        self.triggers.get(&phase).cloned().unwrap_or_default()
    }

    fn phase_funcs(&self, phase: PhaseId) -> Vec<PhaseFunc> {
        self.entries.get(&phase).cloned().unwrap_or_default()
    }
}
