//! World container for live doodads
//!
//! Owns every doodad by object id and maintains the placement hierarchy
//! (stacking and attachment). All engine entry points are routed through
//! here so that doodads deleted during a transition are swept out of the
//! world, and so that removal honours the stacking-safety rule: an object
//! with persistent children attached cannot be removed.

use std::collections::HashMap;
use std::sync::Arc;

use doodad_core::{
    CharacterId, EngineError, ObjectId, PersistError, PersistentId, PhaseTarget, TemplateId,
    WorldError,
};
use doodad_math::Transform;
use parking_lot::RwLock;

use crate::actor::Actor;
use crate::doodad::{AttachPoint, Doodad, DoodadOwnerType, ParentLink};
use crate::persist::Persistence;
use crate::phase::PhaseEngine;
use crate::template::DoodadTemplate;

/// World shared between threads. Per-object exclusion is provided by the lock
pub type SharedWorld = Arc<RwLock<DoodadWorld>>;

/// Every live doodad plus the engine that drives them
pub struct DoodadWorld {
    engine: Arc<PhaseEngine>,
    doodads: HashMap<ObjectId, Doodad>,
    templates: HashMap<TemplateId, Arc<DoodadTemplate>>,
    persistence: Option<Persistence>,
    next_object_id: u32,
}

impl DoodadWorld {
    /// Create an empty world
    pub fn new(engine: Arc<PhaseEngine>) -> Self {
        Self {
            engine,
            doodads: HashMap::new(),
            templates: HashMap::new(),
            persistence: None,
            next_object_id: 1,
        }
    }

    /// Bind storage used by persistent spawns and loading
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Wrap the world for sharing
    pub fn into_shared(self) -> SharedWorld {
        Arc::new(RwLock::new(self))
    }

    pub fn engine(&self) -> &Arc<PhaseEngine> {
        &self.engine
    }

    /// Register a template for spawning and loading
    pub fn register_template(&mut self, template: DoodadTemplate) {
        self.templates.insert(template.id, Arc::new(template));
    }

    pub fn template(&self, id: TemplateId) -> Option<&Arc<DoodadTemplate>> {
        self.templates.get(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Doodad> {
        self.doodads.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Doodad> {
        self.doodads.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.doodads.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.doodads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doodads.is_empty()
    }

    /// Live object ids in ascending order
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.doodads.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Hand out an unused object id
    pub fn allocate_object_id(&mut self) -> ObjectId {
        loop {
            let id = ObjectId::new(self.next_object_id);
            self.next_object_id = if self.next_object_id >= ObjectId::MAX {
                1
            } else {
                self.next_object_id + 1
            };
            if !self.doodads.contains_key(&id) {
                return id;
            }
        }
    }

    /// Create a doodad of a registered template (or a bare one for unknown
    /// templates), place it and move it into its start phase
    pub fn spawn_template(
        &mut self,
        template_id: TemplateId,
        transform: Transform,
        actor: Option<Actor>,
        persistent: bool,
    ) -> Result<ObjectId, WorldError> {
        let object_id = self.allocate_object_id();
        let mut doodad = match self.templates.get(&template_id) {
            Some(template) => Doodad::new(object_id, Arc::clone(template)),
            None => {
                log::warn!("Spawning doodad of unregistered template {}", template_id);
                Doodad::without_template(object_id, template_id)
            }
        }
        .with_transform(transform);

        if let Some(actor) = actor {
            doodad.owner_obj_id = actor.object_id;
            if actor.is_character() {
                doodad = doodad.with_owner(
                    actor.character_id,
                    DoodadOwnerType::Character,
                );
            }
        }
        if persistent {
            let persistence = self
                .persistence
                .clone()
                .ok_or(PersistError::Unbound(object_id))?;
            doodad = doodad.with_persistence(persistence);
        }

        self.spawn(doodad, actor)
    }

    /// Insert a prepared doodad and move it into its start phase
    pub fn spawn(&mut self, doodad: Doodad, actor: Option<Actor>) -> Result<ObjectId, WorldError> {
        let id = doodad.object_id();
        if self.doodads.contains_key(&id) {
            return Err(WorldError::AlreadyPresent(id));
        }
        self.doodads.insert(id, doodad);

        if let Some(doodad) = self.doodads.get_mut(&id) {
            self.engine.start(doodad, actor)?;
        }
        self.after_engine_call(id);
        Ok(id)
    }

    /// Stack or attach `child` onto `parent`, keeping its world transform
    pub fn attach(
        &mut self,
        child: ObjectId,
        parent: ObjectId,
        point: AttachPoint,
    ) -> Result<(), WorldError> {
        let parent_doodad = self.doodads.get(&parent).ok_or(WorldError::UnknownObject(parent))?;
        if !self.doodads.contains_key(&child) {
            return Err(WorldError::UnknownObject(child));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(WorldError::CyclicAttachment { child, parent });
        }

        let parent_world = *parent_doodad.world_transform();
        let link = ParentLink {
            object_id: parent,
            persistent_id: parent_doodad.db_id(),
        };

        self.detach(child)?;

        if let Some(doodad) = self.doodads.get_mut(&child) {
            let placement = doodad.placement_mut();
            placement.local = parent_world.relative(&placement.world);
            placement.parent = Some(link);
            doodad.attach_point = point;
        }
        if let Some(parent_doodad) = self.doodads.get_mut(&parent) {
            parent_doodad.placement_mut().children.push(child);
        }
        Ok(())
    }

    /// Unlink `child` from its parent, keeping its world transform
    pub fn detach(&mut self, child: ObjectId) -> Result<(), WorldError> {
        let doodad = self
            .doodads
            .get_mut(&child)
            .ok_or(WorldError::UnknownObject(child))?;
        let link = match doodad.placement_mut().parent.take() {
            Some(link) => link,
            None => return Ok(()),
        };
        let placement = doodad.placement_mut();
        placement.local = placement.world;
        doodad.attach_point = AttachPoint::NONE;

        if let Some(parent) = self.doodads.get_mut(&link.object_id) {
            parent.placement_mut().children.retain(|c| *c != child);
        }
        Ok(())
    }

    /// Move an object in world space; attached children follow
    pub fn move_to(&mut self, id: ObjectId, world: Transform) -> Result<(), WorldError> {
        let parent = self
            .doodads
            .get(&id)
            .ok_or(WorldError::UnknownObject(id))?
            .placement()
            .parent;
        let parent_world = parent
            .and_then(|link| self.doodads.get(&link.object_id))
            .map(|p| *p.world_transform());

        if let Some(doodad) = self.doodads.get_mut(&id) {
            let placement = doodad.placement_mut();
            placement.world = world;
            placement.local = match parent_world {
                Some(parent_world) => parent_world.relative(&world),
                None => world,
            };
        }
        self.propagate_transform(id);
        Ok(())
    }

    /// Whether `id` may be removed: refused while any direct child has a
    /// durable id
    pub fn allow_removal(&self, id: ObjectId) -> Result<bool, WorldError> {
        let doodad = self.doodads.get(&id).ok_or(WorldError::UnknownObject(id))?;
        Ok(!doodad
            .children()
            .iter()
            .filter_map(|c| self.doodads.get(c))
            .any(|c| c.db_id() > 0))
    }

    /// Remove an object from the world, deleting it and its transient
    /// children. Refused if a persistent object is attached anywhere in the
    /// subtree.
    pub fn remove(&mut self, id: ObjectId) -> Result<(), WorldError> {
        let subtree = self.subtree(id)?;
        for node in &subtree {
            if !self.allow_removal(*node)? {
                log::info!("Removal of doodad {} refused: persistent children attached", id);
                return Err(WorldError::RemovalRefused(id));
            }
        }

        // Children first; a node leaves the map only once its delete succeeded
        for node in subtree.into_iter().rev() {
            if let Some(doodad) = self.doodads.get_mut(&node) {
                self.engine.delete(doodad)?;
            }
            self.detach(node)?;
            self.doodads.remove(&node);
        }
        Ok(())
    }

    /// Drop every doodad that a transition moved into the deleted state.
    ///
    /// Transient children are deleted with their parent; persistent children
    /// are detached in place. Returns the removed ids.
    pub fn sweep_deleted(&mut self) -> Result<Vec<ObjectId>, WorldError> {
        let mut removed = Vec::new();
        let mut pending: Vec<ObjectId> = self
            .doodads
            .values()
            .filter(|d| d.is_deleted())
            .map(|d| d.object_id())
            .collect();
        pending.sort();

        while let Some(id) = pending.pop() {
            let children = match self.doodads.get(&id) {
                Some(doodad) => doodad.children().to_vec(),
                None => continue,
            };
            for child in children {
                let persistent = self.doodads.get(&child).map_or(false, |c| c.db_id() > 0);
                if persistent {
                    self.detach(child)?;
                    if let Some(doodad) = self.doodads.get_mut(&child) {
                        doodad.save()?;
                    }
                } else if let Some(doodad) = self.doodads.get_mut(&child) {
                    self.engine.delete(doodad)?;
                    pending.push(child);
                }
            }
            self.detach(id)?;
            self.doodads.remove(&id);
            removed.push(id);
        }
        Ok(removed)
    }

    /// Interact with an object
    pub fn use_doodad(
        &mut self,
        id: ObjectId,
        actor: Option<Actor>,
        skill_id: u32,
    ) -> Result<(), WorldError> {
        let doodad = self.doodads.get_mut(&id).ok_or(WorldError::UnknownObject(id))?;
        let result = self.engine.use_doodad(doodad, actor, skill_id);
        self.finish_engine_call(id, result)
    }

    /// Strike an object with an effect
    pub fn skill_hit(
        &mut self,
        id: ObjectId,
        caster: Option<Actor>,
        skill_id: u32,
    ) -> Result<(), WorldError> {
        let doodad = self.doodads.get_mut(&id).ok_or(WorldError::UnknownObject(id))?;
        let result = self.engine.on_skill_hit(doodad, caster, skill_id);
        self.finish_engine_call(id, result)
    }

    /// Force an object into a phase
    pub fn go_to_phase(
        &mut self,
        id: ObjectId,
        actor: Option<Actor>,
        target: PhaseTarget,
    ) -> Result<(), WorldError> {
        let doodad = self.doodads.get_mut(&id).ok_or(WorldError::UnknownObject(id))?;
        let result = self.engine.go_to_phase(doodad, actor, target, 0);
        self.finish_engine_call(id, result)
    }

    /// Start showing an object to a character
    pub fn show_to(&mut self, id: ObjectId, observer: CharacterId) -> Result<(), WorldError> {
        let doodad = self.doodads.get_mut(&id).ok_or(WorldError::UnknownObject(id))?;
        doodad.add_observer(observer, self.engine.observers().as_ref());
        Ok(())
    }

    /// Stop showing an object to a character
    pub fn hide_from(&mut self, id: ObjectId, observer: CharacterId) -> Result<(), WorldError> {
        let doodad = self.doodads.get_mut(&id).ok_or(WorldError::UnknownObject(id))?;
        doodad.remove_observer(observer, self.engine.observers().as_ref());
        Ok(())
    }

    /// Load every stored doodad and restore parent links.
    ///
    /// Records whose parent is missing are placed unparented at their stored
    /// world transform.
    pub fn load_records(&mut self) -> Result<Vec<ObjectId>, WorldError> {
        let persistence = match &self.persistence {
            Some(persistence) => persistence.clone(),
            None => return Ok(Vec::new()),
        };
        let records = persistence.store().load_all()?;

        let mut by_db_id: HashMap<PersistentId, ObjectId> = HashMap::new();
        let mut loaded = Vec::with_capacity(records.len());
        for record in &records {
            let object_id = self.allocate_object_id();
            let template = self.templates.get(&record.template_id).cloned();
            let doodad = Doodad::from_record(object_id, record, template, persistence.clone());
            self.doodads.insert(object_id, doodad);
            by_db_id.insert(record.id, object_id);
            loaded.push(object_id);
        }

        for record in records.iter().filter(|r| r.parent_doodad != 0) {
            let child = by_db_id.get(&record.id).copied();
            let parent = by_db_id.get(&record.parent_doodad).copied();
            match (child, parent) {
                (Some(child), Some(parent)) => self.attach(child, parent, AttachPoint::NONE)?,
                _ => log::warn!(
                    "Doodad record {} references missing parent {}",
                    record.id,
                    record.parent_doodad
                ),
            }
        }

        log::info!("Loaded {} doodads from storage", loaded.len());
        Ok(loaded)
    }

    fn finish_engine_call(
        &mut self,
        id: ObjectId,
        result: Result<(), EngineError>,
    ) -> Result<(), WorldError> {
        self.after_engine_call(id);
        result?;
        self.sweep_deleted()?;
        Ok(())
    }

    /// Refresh the durable parent id seen by children after `id` may have
    /// been saved for the first time
    fn after_engine_call(&mut self, id: ObjectId) {
        let (db_id, children) = match self.doodads.get(&id) {
            Some(doodad) => (doodad.db_id(), doodad.children().to_vec()),
            None => return,
        };
        for child in children {
            if let Some(doodad) = self.doodads.get_mut(&child) {
                if let Some(link) = doodad.placement_mut().parent.as_mut() {
                    link.persistent_id = db_id;
                }
            }
        }
    }

    fn propagate_transform(&mut self, id: ObjectId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let (world, children) = match self.doodads.get(&current) {
                Some(doodad) => (*doodad.world_transform(), doodad.children().to_vec()),
                None => continue,
            };
            for child in children {
                if let Some(doodad) = self.doodads.get_mut(&child) {
                    let placement = doodad.placement_mut();
                    placement.world = world.combine(&placement.local);
                    stack.push(child);
                }
            }
        }
    }

    /// Whether `ancestor` is above `id` in the hierarchy
    fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = self.doodads.get(&id).and_then(|d| d.placement().parent);
        while let Some(link) = current {
            if link.object_id == ancestor {
                return true;
            }
            current = self
                .doodads
                .get(&link.object_id)
                .and_then(|d| d.placement().parent);
        }
        false
    }

    /// `id` followed by all its descendants, parents before children
    fn subtree(&self, id: ObjectId) -> Result<Vec<ObjectId>, WorldError> {
        if !self.doodads.contains_key(&id) {
            return Err(WorldError::UnknownObject(id));
        }
        let mut nodes = vec![id];
        let mut i = 0;
        while i < nodes.len() {
            if let Some(doodad) = self.doodads.get(&nodes[i]) {
                nodes.extend(doodad.children().iter().copied());
            }
            i += 1;
        }
        Ok(nodes)
    }
}
