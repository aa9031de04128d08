//! Scenario playback against a fully wired world

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use crossbeam_channel::Receiver;
use doodad_core::{
    CharacterId, ManualClock, ObjectId, PhaseId, PhaseTarget, SequentialIds, WorldError,
};
use doodad_engine::{Actor, AttachPoint, DoodadWorld, Persistence, PhaseEngine};
use doodad_funcs::TemplateSet;
use doodad_math::{radians, Quat, Transform, Vec3};
use doodad_net::{NetBroadcaster, OutgoingPacket};
use doodad_store::highest_id;

use crate::config::RuntimeConfig;
use crate::scenario::{Scenario, SpawnDef, Step};
use crate::RuntimeError;

/// Totals for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimReport {
    /// Doodads restored from the store
    pub loaded: usize,
    /// Doodads created by the scenario
    pub spawned: usize,
    pub steps: usize,
    /// Packets delivered to connected characters
    pub packets: usize,
    /// Doodads still in the world at the end
    pub live: usize,
}

/// World, broadcaster and clock wired together
pub struct Simulation {
    world: DoodadWorld,
    net: Arc<NetBroadcaster>,
    clock: Arc<ManualClock>,
    names: HashMap<String, ObjectId>,
    actors: HashMap<CharacterId, ObjectId>,
    sessions: Vec<(CharacterId, Receiver<OutgoingPacket>)>,
    report: SimReport,
}

impl Simulation {
    /// Open the store, build the engine and restore stored doodads
    pub fn build(config: &RuntimeConfig, templates: TemplateSet) -> Result<Self, RuntimeError> {
        let store = config.store.open()?;
        let ids = SequentialIds::starting_at(highest_id(store.as_ref())?.saturating_add(1));
        let persistence = Persistence::new(store, Arc::new(ids));

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let net = Arc::new(NetBroadcaster::default().with_clock(clock.clone()));

        let TemplateSet { templates, catalog } = templates;
        let engine = PhaseEngine::with_config(Arc::new(catalog), net.clone(), config.engine.clone())
            .with_clock(clock.clone());

        let mut world = DoodadWorld::new(Arc::new(engine)).with_persistence(persistence);
        for template in templates {
            world.register_template(template);
        }
        let loaded = world.load_records()?;
        if !loaded.is_empty() {
            log::info!("Restored {} doodads from {}", loaded.len(), config.store);
        }

        Ok(Self {
            world,
            net,
            clock,
            names: HashMap::new(),
            actors: HashMap::new(),
            sessions: Vec::new(),
            report: SimReport {
                loaded: loaded.len(),
                ..SimReport::default()
            },
        })
    }

    pub fn world(&self) -> &DoodadWorld {
        &self.world
    }

    /// Object id bound to a scenario name
    pub fn object(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Current phase of a named doodad, `None` once it has left the world
    pub fn phase_of(&self, name: &str) -> Option<PhaseId> {
        let id = self.object(name)?;
        self.world.get(id).map(|d| d.current_phase_id())
    }

    /// Spawn everything, then replay every step
    pub fn run(&mut self, scenario: &Scenario) -> Result<SimReport, RuntimeError> {
        for def in &scenario.spawn {
            self.spawn(def)?;
        }
        self.drain_packets();

        for step in &scenario.step {
            self.step(step)?;
            self.report.steps += 1;
            self.drain_packets();
        }

        self.report.live = self.world.len();
        Ok(self.report.clone())
    }

    fn spawn(&mut self, def: &SpawnDef) -> Result<(), RuntimeError> {
        let actor = def.owner.map(|character| self.actor(character));
        if let Some(owner) = def.owner {
            self.connect(owner);
        }

        let transform = Transform::from_position(Vec3::from(def.position))
            .with_rotation(Quat::from_yaw(radians(def.yaw)));
        let id = self
            .world
            .spawn_template(def.template, transform, actor, def.persistent)?;

        if let Some(parent) = &def.parent {
            let parent = self.lookup(parent)?;
            self.world.attach(id, parent, AttachPoint::NONE)?;
        }
        self.names.insert(def.name.clone(), id);
        self.report.spawned += 1;

        for &observer in &def.observers {
            self.connect(observer);
            self.world.show_to(id, observer)?;
        }

        log::info!(
            "Spawned '{}' as doodad {} (template {}, phase {})",
            def.name,
            id,
            def.template,
            self.phase_of(&def.name).unwrap_or(0)
        );
        Ok(())
    }

    fn step(&mut self, step: &Step) -> Result<(), RuntimeError> {
        let target = match step.target() {
            Some(name) => {
                let id = self.lookup(name)?;
                if !self.world.contains(id) {
                    log::warn!("Skipping {:?}: '{}' is no longer in the world", step, name);
                    return Ok(());
                }
                Some((name, id))
            }
            None => None,
        };

        match (step, target) {
            (Step::Use { skill, actor, .. }, Some((_, id))) => {
                let actor = actor.map(|character| self.actor(character));
                self.world.use_doodad(id, actor, *skill)?;
            }
            (Step::SkillHit { skill, caster, .. }, Some((_, id))) => {
                let caster = caster.map(|character| self.actor(character));
                self.world.skill_hit(id, caster, *skill)?;
            }
            (Step::GoToPhase { phase, .. }, Some((_, id))) => match PhaseTarget::from_raw(*phase) {
                Some(target) => self.world.go_to_phase(id, None, target)?,
                None => log::warn!("Ignoring transition of doodad {} to phase 0", id),
            },
            (Step::Remove { .. }, Some((name, id))) => match self.world.remove(id) {
                Ok(()) => log::info!("Removed '{}'", name),
                Err(WorldError::RemovalRefused(_)) => {
                    log::warn!("Removal of '{}' refused: persistent doodads are stacked on it", name)
                }
                Err(e) => return Err(e.into()),
            },
            (Step::Show { character, .. }, Some((_, id))) => {
                self.connect(*character);
                self.world.show_to(id, *character)?;
            }
            (Step::Hide { character, .. }, Some((_, id))) => {
                self.world.hide_from(id, *character)?;
            }
            (Step::Advance { ms }, _) => {
                self.clock.advance(Duration::milliseconds(i64::from(*ms)));
                log::info!("Clock advanced {} ms", ms);
            }
            (step, None) => {
                return Err(RuntimeError::Scenario(format!("step {:?} has no target", step)));
            }
        }

        if let Some((name, _)) = target {
            match self.phase_of(name) {
                Some(phase) => log::info!("'{}' is in phase {}", name, phase),
                None => log::info!("'{}' has left the world", name),
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<ObjectId, RuntimeError> {
        self.object(name)
            .ok_or_else(|| RuntimeError::Scenario(format!("unknown doodad '{}'", name)))
    }

    /// In-world unit for a character, allocated on first use
    fn actor(&mut self, character: CharacterId) -> Actor {
        let object_id = match self.actors.get(&character) {
            Some(&id) => id,
            None => {
                let id = self.world.allocate_object_id();
                self.actors.insert(character, id);
                id
            }
        };
        Actor::character(object_id, character)
    }

    fn connect(&mut self, character: CharacterId) {
        if !self.net.is_connected(character) {
            let rx = self.net.connect(character);
            self.sessions.push((character, rx));
        }
    }

    fn drain_packets(&mut self) {
        for (character, rx) in &self.sessions {
            for packet in rx.try_iter() {
                log::info!(
                    "-> character {}: {} (0x{:04X}, {} bytes)",
                    character,
                    packet.name,
                    packet.opcode,
                    packet.payload.len()
                );
                self.report.packets += 1;
            }
        }
    }
}
