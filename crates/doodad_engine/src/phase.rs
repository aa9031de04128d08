//! Phase execution engine
//!
//! Drives a doodad through its phases:
//! - `use_doodad` fires the first matching trigger function and follows its
//!   declared transition
//! - `go_to_phase` enters a phase, runs its phase-entry functions (cascading
//!   through override requests) and broadcasts the result
//! - `go_to_phase_and_use` does the same, then re-fires the interaction
//!   against the new phase
//!
//! Function faults are contained: they are logged as fatal and end the
//! current pass. Persistence failures always propagate.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use doodad_core::{
    Clock, EngineConfig, EngineError, FuncError, PhaseId, PhaseTarget, SystemClock,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actor::Actor;
use crate::catalog::FuncGroupCatalog;
use crate::doodad::Doodad;
use crate::func::FuncContext;
use crate::observer::ObserverBroadcaster;

/// Upper bound (exclusive) of a phase ratio roll
pub const PHASE_RATIO_MAX: i32 = 10_000;

/// Runs trigger and phase-entry functions against doodads
pub struct PhaseEngine {
    catalog: Arc<dyn FuncGroupCatalog>,
    observers: Arc<dyn ObserverBroadcaster>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl PhaseEngine {
    /// Create an engine with the default configuration
    pub fn new(catalog: Arc<dyn FuncGroupCatalog>, observers: Arc<dyn ObserverBroadcaster>) -> Self {
        Self::with_config(catalog, observers, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration
    pub fn with_config(
        catalog: Arc<dyn FuncGroupCatalog>,
        observers: Arc<dyn ObserverBroadcaster>,
        config: EngineConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            catalog,
            observers,
            clock: Arc::new(SystemClock),
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn FuncGroupCatalog> {
        &self.catalog
    }

    pub fn observers(&self) -> &Arc<dyn ObserverBroadcaster> {
        &self.observers
    }

    /// Current time according to the engine clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Move a freshly created doodad into its template's start phase
    pub fn start(&self, doodad: &mut Doodad, actor: Option<Actor>) -> Result<(), EngineError> {
        if doodad.is_deleted() || doodad.current_phase_id() != 0 {
            return Ok(());
        }
        let start = doodad.func_group_id();
        if start == 0 {
            log::warn!(
                "Doodad {} (template {}) has no start function group",
                doodad.object_id(),
                doodad.template_id()
            );
            return Ok(());
        }
        self.go_to_phase(doodad, actor, PhaseTarget::Phase(start), 0)
    }

    /// Interact with a doodad
    pub fn use_doodad(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        skill_id: u32,
    ) -> Result<(), EngineError> {
        self.use_at_depth(doodad, actor, skill_id, 0)
    }

    /// Interact with a doodad from inside an ongoing transition chain
    pub fn use_at_depth(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        skill_id: u32,
        depth: u32,
    ) -> Result<(), EngineError> {
        if doodad.is_deleted() {
            return Ok(());
        }
        let depth = depth + 1;
        self.check_depth(doodad, depth)?;
        doodad.reset_use_signals();

        let func = match self
            .catalog
            .trigger_funcs(doodad.current_phase_id())
            .into_iter()
            .find(|f| f.matches(skill_id))
        {
            Some(func) => func,
            None => return Ok(()),
        };

        let next_phase = func.next_phase;
        match self.run_guarded(doodad, actor, skill_id, next_phase, |ctx| func.execute(ctx)) {
            Ok(()) => {}
            Err(FuncError::Persist(e)) => return Err(e.into()),
            Err(e) => {
                log::error!(
                    "FATAL: doodad {} (template {}) trigger function {} failed in phase {}: {}",
                    doodad.object_id(),
                    doodad.template_id(),
                    func.func_type,
                    doodad.current_phase_id(),
                    e
                );
                return Ok(());
            }
        }

        doodad.set_next_phase_requested(next_phase);
        let target = match next_phase {
            Some(target) => target,
            None => return Ok(()),
        };

        if doodad.use_on_arrival() {
            self.go_to_phase_and_use(doodad, actor, target, skill_id, depth)
        } else {
            self.transition(doodad, actor, target, skill_id, depth)
                .map(|_| ())
        }
    }

    /// Run the phase-entry functions of the current phase, following
    /// override requests until a pass requests none. The doodad is saved
    /// once the cascade settles.
    pub fn do_phase(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        skill_id: u32,
        depth: u32,
    ) -> Result<(), EngineError> {
        let mut depth = depth;
        loop {
            if doodad.is_deleted() {
                return Ok(());
            }
            doodad.clear_override();

            for func in self.catalog.phase_funcs(doodad.current_phase_id()) {
                match self.run_guarded(doodad, actor, skill_id, None, |ctx| func.execute(ctx)) {
                    Ok(()) => {}
                    Err(FuncError::Persist(e)) => return Err(e.into()),
                    Err(e) => {
                        log::error!(
                            "FATAL: doodad {} (template {}) phase function {} failed in phase {}: {}",
                            doodad.object_id(),
                            doodad.template_id(),
                            func.func_type,
                            doodad.current_phase_id(),
                            e
                        );
                        break;
                    }
                }
                if doodad.override_phase().is_some() {
                    break;
                }
            }

            match doodad.override_phase() {
                None => break,
                Some(PhaseTarget::Delete) => {
                    self.delete(doodad)?;
                    return Ok(());
                }
                Some(PhaseTarget::Phase(next)) => {
                    depth += 1;
                    if let Err(e) = self.check_depth(doodad, depth) {
                        // Settle in the phase reached so far
                        doodad.clear_override();
                        doodad.save()?;
                        self.observers.broadcast_phase_changed(doodad, true);
                        return Err(e);
                    }
                    if !self.phase_allowed(doodad, next) {
                        break;
                    }
                    self.observers.broadcast_phase_changed(doodad, true);
                    self.roll_into(doodad, next);
                }
            }
        }

        doodad.clear_override();
        doodad.save()?;
        Ok(())
    }

    /// Move a doodad to `target`
    pub fn go_to_phase(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        target: PhaseTarget,
        skill_id: u32,
    ) -> Result<(), EngineError> {
        self.transition(doodad, actor, target, skill_id, 0)
            .map(|_| ())
    }

    /// Move a doodad to `target`, then interact with it again
    pub fn go_to_phase_and_use(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        target: PhaseTarget,
        skill_id: u32,
        depth: u32,
    ) -> Result<(), EngineError> {
        if self.transition(doodad, actor, target, skill_id, depth)? {
            self.use_at_depth(doodad, actor, skill_id, depth)
        } else {
            Ok(())
        }
    }

    /// Fire `use` once for every skill-hit function of the current phase
    pub fn on_skill_hit(
        &self,
        doodad: &mut Doodad,
        caster: Option<Actor>,
        skill_id: u32,
    ) -> Result<(), EngineError> {
        let hits = self
            .catalog
            .trigger_funcs(doodad.current_phase_id())
            .iter()
            .filter(|f| f.is_skill_hit())
            .count();

        if hits > 0 {
            log::trace!(
                "Doodad {} hit by skill {} from {:?}",
                doodad.object_id(),
                skill_id,
                caster.map(|c| c.object_id)
            );
        }

        for _ in 0..hits {
            if doodad.is_deleted() {
                break;
            }
            self.use_doodad(doodad, None, skill_id)?;
        }
        Ok(())
    }

    /// Put a doodad into the terminal deleted state
    pub fn delete(&self, doodad: &mut Doodad) -> Result<(), EngineError> {
        if doodad.is_deleted() {
            return Ok(());
        }
        log::debug!(
            "Deleting doodad {} (template {}) in phase {}",
            doodad.object_id(),
            doodad.template_id(),
            doodad.current_phase_id()
        );
        doodad.delete(self.observers.as_ref())?;
        Ok(())
    }

    /// Enter `target`, run the phase-entry cascade and broadcast. Returns
    /// whether the doodad ended up alive in a new phase.
    fn transition(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        target: PhaseTarget,
        skill_id: u32,
        depth: u32,
    ) -> Result<bool, EngineError> {
        if doodad.is_deleted() {
            return Ok(false);
        }
        let phase = match target {
            PhaseTarget::Delete => {
                self.delete(doodad)?;
                return Ok(false);
            }
            PhaseTarget::Phase(phase) => phase,
        };

        if !self.enter_phase(doodad, phase) {
            return Ok(false);
        }
        self.do_phase(doodad, actor, skill_id, depth)?;
        if doodad.is_deleted() {
            return Ok(false);
        }
        self.observers.broadcast_phase_changed(doodad, true);
        Ok(true)
    }

    fn enter_phase(&self, doodad: &mut Doodad, phase: PhaseId) -> bool {
        if !self.phase_allowed(doodad, phase) {
            return false;
        }
        self.roll_into(doodad, phase);
        true
    }

    fn phase_allowed(&self, doodad: &Doodad, phase: PhaseId) -> bool {
        if doodad.accepts_phase(phase) {
            return true;
        }
        log::error!(
            "Doodad {} (template {}) has no function group {}, transition refused",
            doodad.object_id(),
            doodad.template_id(),
            phase
        );
        false
    }

    fn roll_into(&self, doodad: &mut Doodad, phase: PhaseId) {
        let ratio = self.rng.lock().gen_range(0..PHASE_RATIO_MAX);
        doodad.enter_phase(phase, ratio);
    }

    fn check_depth(&self, doodad: &Doodad, depth: u32) -> Result<(), EngineError> {
        if self.config.warn_at(depth) {
            log::warn!(
                "Doodad {} (template {}) may be looping: transition depth {}",
                doodad.object_id(),
                doodad.template_id(),
                depth
            );
        }
        if self.config.exceeds_limit(depth) {
            log::error!(
                "Doodad {} (template {}) aborted transition chain at depth {}",
                doodad.object_id(),
                doodad.template_id(),
                depth
            );
            return Err(EngineError::RecursionLimit {
                object: doodad.object_id(),
                template: doodad.template_id(),
                depth,
            });
        }
        Ok(())
    }

    fn run_guarded<F>(
        &self,
        doodad: &mut Doodad,
        actor: Option<Actor>,
        skill_id: u32,
        next_phase: Option<PhaseTarget>,
        f: F,
    ) -> Result<(), FuncError>
    where
        F: FnOnce(&mut FuncContext<'_>) -> Result<(), FuncError>,
    {
        let mut ctx = FuncContext {
            actor,
            doodad,
            skill_id,
            next_phase,
            now: self.clock.now(),
        };
        match panic::catch_unwind(AssertUnwindSafe(|| f(&mut ctx))) {
            Ok(result) => result,
            Err(payload) => Err(FuncError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::func::{PhaseFunc, TriggerFunc};
    use crate::observer::NullBroadcaster;
    use doodad_core::ObjectId;

    fn engine(catalog: MemoryCatalog) -> PhaseEngine {
        PhaseEngine::with_config(
            Arc::new(catalog),
            Arc::new(NullBroadcaster),
            EngineConfig::default().with_seed(7),
        )
    }

    fn noop(_: &mut FuncContext<'_>) -> Result<(), FuncError> {
        Ok(())
    }

    #[test]
    fn test_use_without_matching_trigger_is_noop() {
        let catalog = MemoryCatalog::new().with_trigger(
            5,
            TriggerFunc::new("DoodadFuncUse", noop)
                .with_skill(3)
                .with_next_phase(PhaseTarget::Phase(7)),
        );
        let engine = engine(catalog);
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);
        engine.go_to_phase(&mut doodad, None, PhaseTarget::Phase(5), 0).unwrap();

        engine.use_doodad(&mut doodad, None, 4).unwrap();
        assert_eq!(doodad.current_phase_id(), 5);
    }

    #[test]
    fn test_ratio_rolled_on_entry() {
        let engine = engine(MemoryCatalog::new());
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);
        doodad.add_cumulative_ratio(500);

        engine.go_to_phase(&mut doodad, None, PhaseTarget::Phase(3), 0).unwrap();
        assert!((0..PHASE_RATIO_MAX).contains(&doodad.phase_ratio()));
        assert_eq!(doodad.cumulative_phase_ratio(), 0);
    }

    #[test]
    fn test_panicking_phase_func_is_contained() {
        let catalog = MemoryCatalog::new()
            .with_phase_func(2, PhaseFunc::from_fn("Boom", |_| panic!("bad content")))
            .with_phase_func(2, PhaseFunc::new("Never", noop));
        let engine = engine(catalog);
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);

        engine.go_to_phase(&mut doodad, None, PhaseTarget::Phase(2), 0).unwrap();
        assert_eq!(doodad.current_phase_id(), 2);
        assert!(!doodad.is_deleted());
    }

    #[test]
    fn test_recursion_cap() {
        let catalog = MemoryCatalog::new().with_phase_func(
            1,
            PhaseFunc::from_fn("Loop", |ctx| {
                ctx.doodad.request_override(PhaseTarget::Phase(1));
                Ok(())
            }),
        );
        let engine = PhaseEngine::with_config(
            Arc::new(catalog),
            Arc::new(NullBroadcaster),
            EngineConfig::default().with_max_recursion_depth(Some(20)),
        );
        let mut doodad = Doodad::without_template(ObjectId::new(1), 1);

        let err = engine
            .go_to_phase(&mut doodad, None, PhaseTarget::Phase(1), 0)
            .unwrap_err();
        assert!(matches!(err, EngineError::RecursionLimit { depth: 21, .. }));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
