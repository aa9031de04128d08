//! Interactive object state
//!
//! A [`Doodad`] is one live instance of a template: its current phase,
//! ownership, timers, presentation data and placement in the world. Phase
//! fields are only moved by the engine; functions signal transitions through
//! [`Doodad::request_override`] and [`Doodad::request_use_on_arrival`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use doodad_core::{
    millis_until, CharacterId, ObjectId, PersistError, PersistentId, PhaseId, PhaseTarget,
    TemplateId,
};
use doodad_math::{Quat, Transform, Vec3};
use serde::{Deserialize, Serialize};

use crate::observer::{ObserverBroadcaster, Visibility};
use crate::persist::{DoodadRecord, Persistence};
use crate::seat::VehicleSeat;
use crate::template::DoodadTemplate;

/// Who owns a doodad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DoodadOwnerType {
    /// World/system owned
    System = 1,
    /// Owned by a character
    Character = 2,
    /// Part of a house
    Housing = 3,
    /// Part of a shipyard
    Shipyard = 4,
}

impl DoodadOwnerType {
    /// Wire/storage code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire/storage code, defaulting to `System`
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Self::Character,
            3 => Self::Housing,
            4 => Self::Shipyard,
            _ => Self::System,
        }
    }
}

impl Default for DoodadOwnerType {
    fn default() -> Self {
        Self::System
    }
}

/// Attach point relative to the parent object (door of a house, seat of a
/// carriage...). Zero means "not attached"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachPoint(pub u8);

impl AttachPoint {
    pub const NONE: Self = Self(0);

    /// Whether a real attach point is set
    pub fn is_attached(self) -> bool {
        self.0 != 0
    }
}

/// Specialisation of a doodad
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoodadKind {
    /// Plain interactive object
    Plain,
    /// Storage container backed by an item container
    Coffer { item_container_id: u64 },
}

impl Default for DoodadKind {
    fn default() -> Self {
        Self::Plain
    }
}

/// Link to the parent object in the placement hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    /// Parent's in-world id
    pub object_id: ObjectId,
    /// Parent's durable id, 0 if the parent is transient
    pub persistent_id: PersistentId,
}

/// World and local transforms plus hierarchy links
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// World-space transform
    pub world: Transform,
    /// Transform relative to the parent (equals `world` when unparented)
    pub local: Transform,
    /// Parent object, if stacked on or attached to one
    pub parent: Option<ParentLink>,
    /// Objects stacked on or attached to this one
    pub children: Vec<ObjectId>,
}

/// One live interactive object
#[derive(Debug)]
pub struct Doodad {
    object_id: ObjectId,
    template_id: TemplateId,
    template: Option<Arc<DoodadTemplate>>,
    /// Object specialisation
    pub kind: DoodadKind,

    db_id: PersistentId,
    is_persistent: bool,
    deleted: bool,

    current_phase_id: PhaseId,
    phase_ratio: i32,
    cumulative_phase_ratio: i32,
    override_phase: Option<PhaseTarget>,
    to_phase_and_use: bool,
    next_phase_requested: Option<PhaseTarget>,

    pub owner_id: CharacterId,
    pub owner_obj_id: ObjectId,
    pub owner_type: DoodadOwnerType,
    pub attach_point: AttachPoint,
    pub house_id: u32,
    pub item_id: u64,
    pub ucc_id: u64,
    pub item_template_id: u32,

    pub plant_time: Option<DateTime<Utc>>,
    pub growth_time: Option<DateTime<Utc>>,

    scale: f32,
    pub quest_glow: u32,
    data: i32,

    placement: Placement,
    /// Vehicle seats owned by this doodad
    pub seat: Option<VehicleSeat>,
    visibility: Visibility,
    persistence: Option<Persistence>,
}

impl Doodad {
    /// Create a doodad of `template` with no active phase
    pub fn new(object_id: ObjectId, template: Arc<DoodadTemplate>) -> Self {
        let mut doodad = Self::without_template(object_id, template.id);
        doodad.template = Some(template);
        doodad
    }

    /// Create a doodad that only knows its template id
    pub fn without_template(object_id: ObjectId, template_id: TemplateId) -> Self {
        Self {
            object_id,
            template_id,
            template: None,
            kind: DoodadKind::Plain,
            db_id: 0,
            is_persistent: false,
            deleted: false,
            current_phase_id: 0,
            phase_ratio: 0,
            cumulative_phase_ratio: 0,
            override_phase: None,
            to_phase_and_use: false,
            next_phase_requested: None,
            owner_id: 0,
            owner_obj_id: ObjectId::NONE,
            owner_type: DoodadOwnerType::System,
            attach_point: AttachPoint::NONE,
            house_id: 0,
            item_id: 0,
            ucc_id: 0,
            item_template_id: 0,
            plant_time: None,
            growth_time: None,
            scale: 1.0,
            quest_glow: 0,
            data: 0,
            placement: Placement::default(),
            seat: None,
            visibility: Visibility::default(),
            persistence: None,
        }
    }

    /// Rebuild a doodad from its stored record.
    ///
    /// The doodad is placed at the stored world transform with no parent;
    /// re-parenting is left to the loader.
    pub fn from_record(
        object_id: ObjectId,
        record: &DoodadRecord,
        template: Option<Arc<DoodadTemplate>>,
        persistence: Persistence,
    ) -> Self {
        let mut doodad = Self::without_template(object_id, record.template_id);
        doodad.template = template;
        doodad.db_id = record.id;
        doodad.is_persistent = true;
        doodad.persistence = Some(persistence);
        doodad.current_phase_id = record.current_phase_id;
        doodad.owner_id = record.owner_id;
        doodad.owner_type = DoodadOwnerType::from_code(record.owner_type);
        doodad.plant_time = record.plant_time;
        doodad.growth_time = record.growth_time;
        doodad.item_id = record.item_id;
        doodad.house_id = record.house_id;
        doodad.item_template_id = record.item_template_id;
        doodad.data = record.data;
        if record.item_container_id != 0 {
            doodad.kind = DoodadKind::Coffer {
                item_container_id: record.item_container_id,
            };
        }
        let world = Transform::new(
            Vec3::new(record.x, record.y, record.z),
            Quat::from_roll_pitch_yaw(record.roll, record.pitch, record.yaw),
        );
        doodad.placement.world = world;
        doodad.placement.local = world;
        doodad
    }

    /// Set the owning character
    pub fn with_owner(mut self, owner_id: CharacterId, owner_type: DoodadOwnerType) -> Self {
        self.owner_id = owner_id;
        self.owner_type = owner_type;
        self
    }

    /// Place the doodad in the world
    pub fn with_transform(mut self, world: Transform) -> Self {
        self.placement.world = world;
        self.placement.local = world;
        self
    }

    /// Set the object specialisation
    pub fn with_kind(mut self, kind: DoodadKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the doodad as durable and bind it to storage
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.is_persistent = true;
        self.persistence = Some(persistence);
        self
    }

    // --- identity -------------------------------------------------------

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn template_id(&self) -> TemplateId {
        self.template_id
    }

    pub fn template(&self) -> Option<&Arc<DoodadTemplate>> {
        self.template.as_ref()
    }

    /// Durable id, 0 if never saved
    pub fn db_id(&self) -> PersistentId {
        self.db_id
    }

    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Item container backing this doodad, 0 for plain doodads
    pub fn item_container_id(&self) -> u64 {
        match self.kind {
            DoodadKind::Plain => 0,
            DoodadKind::Coffer { item_container_id } => item_container_id,
        }
    }

    // --- phase state ----------------------------------------------------

    pub fn current_phase_id(&self) -> PhaseId {
        self.current_phase_id
    }

    pub fn phase_ratio(&self) -> i32 {
        self.phase_ratio
    }

    pub fn cumulative_phase_ratio(&self) -> i32 {
        self.cumulative_phase_ratio
    }

    /// Add to the cumulative ratio and return the new total
    pub fn add_cumulative_ratio(&mut self, ratio: i32) -> i32 {
        self.cumulative_phase_ratio = self.cumulative_phase_ratio.saturating_add(ratio);
        self.cumulative_phase_ratio
    }

    /// Ids of the template's start groups
    pub fn start_func_groups(&self) -> Vec<PhaseId> {
        self.template
            .as_ref()
            .map(|t| t.start_func_groups())
            .unwrap_or_default()
    }

    /// The template's first start group, 0 if none
    pub fn func_group_id(&self) -> PhaseId {
        self.template
            .as_ref()
            .map(|t| t.start_func_group())
            .unwrap_or(0)
    }

    /// Whether `phase` is a valid destination for this doodad
    pub fn accepts_phase(&self, phase: PhaseId) -> bool {
        self.template.as_ref().map_or(true, |t| t.has_phase(phase))
    }

    /// Ask the engine to move on to `target` once the current phase-entry
    /// pass stops
    pub fn request_override(&mut self, target: PhaseTarget) {
        self.override_phase = Some(target);
    }

    pub fn override_phase(&self) -> Option<PhaseTarget> {
        self.override_phase
    }

    /// Ask the engine to re-run the triggering interaction after the
    /// declared transition
    pub fn request_use_on_arrival(&mut self) {
        self.to_phase_and_use = true;
    }

    pub fn use_on_arrival(&self) -> bool {
        self.to_phase_and_use
    }

    /// Destination declared by the last matched trigger function
    pub fn next_phase_requested(&self) -> Option<PhaseTarget> {
        self.next_phase_requested
    }

    pub(crate) fn enter_phase(&mut self, phase: PhaseId, ratio: i32) {
        self.current_phase_id = phase;
        self.phase_ratio = ratio;
        self.cumulative_phase_ratio = 0;
    }

    pub(crate) fn clear_override(&mut self) {
        self.override_phase = None;
    }

    pub(crate) fn reset_use_signals(&mut self) {
        self.to_phase_and_use = false;
        self.next_phase_requested = None;
    }

    pub(crate) fn set_next_phase_requested(&mut self, target: Option<PhaseTarget>) {
        self.next_phase_requested = target;
    }

    // --- presentation ---------------------------------------------------

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn data(&self) -> i32 {
        self.data
    }

    /// Write the opaque data value. A change is saved immediately when the
    /// doodad already has a durable id
    pub fn set_data(&mut self, data: i32) -> Result<(), PersistError> {
        if data == self.data {
            return Ok(());
        }
        self.data = data;
        if self.db_id > 0 {
            self.save()?;
        }
        Ok(())
    }

    /// Write the data value without saving (loading, spawning)
    pub fn init_data(&mut self, data: i32) {
        self.data = data;
    }

    /// Milliseconds until growth completes
    pub fn time_left(&self, now: DateTime<Utc>) -> u32 {
        millis_until(now, self.growth_time)
    }

    // --- placement ------------------------------------------------------

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub(crate) fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }

    pub fn world_transform(&self) -> &Transform {
        &self.placement.world
    }

    pub fn local_transform(&self) -> &Transform {
        &self.placement.local
    }

    /// Parent's in-world id, `ObjectId::NONE` when unparented
    pub fn parent_obj_id(&self) -> ObjectId {
        self.placement
            .parent
            .map(|p| p.object_id)
            .unwrap_or(ObjectId::NONE)
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.placement.children
    }

    // --- visibility -----------------------------------------------------

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Start showing the doodad to `observer`
    pub fn add_observer(&mut self, observer: CharacterId, broadcaster: &dyn ObserverBroadcaster) {
        if self.deleted {
            return;
        }
        if self.visibility.insert(observer) {
            broadcaster.notify_created(self, observer);
        }
    }

    /// Stop showing the doodad to `observer`
    pub fn remove_observer(&mut self, observer: CharacterId, broadcaster: &dyn ObserverBroadcaster) {
        if self.visibility.remove(observer) {
            broadcaster.notify_removed(self.object_id, observer);
        }
    }

    // --- persistence ----------------------------------------------------

    /// Bind storage without changing the persistent flag
    pub fn bind_persistence(&mut self, persistence: Persistence) {
        self.persistence = Some(persistence);
    }

    pub fn is_bound(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.is_persistent = persistent;
    }

    /// Write the doodad to storage.
    ///
    /// No-op for non-persistent doodads. The first save allocates the
    /// durable id.
    pub fn save(&mut self) -> Result<(), PersistError> {
        if !self.is_persistent {
            return Ok(());
        }
        let persistence = self
            .persistence
            .clone()
            .ok_or(PersistError::Unbound(self.object_id))?;

        if self.db_id == 0 {
            self.db_id = persistence.allocate_id();
            log::debug!("Doodad {} assigned durable id {}", self.object_id, self.db_id);
        }

        persistence.store().save(&self.to_record())
    }

    /// Stored form of the doodad, always in world space
    pub fn to_record(&self) -> DoodadRecord {
        let world = &self.placement.world;
        let (roll, pitch, yaw) = world.roll_pitch_yaw();
        DoodadRecord {
            id: self.db_id,
            owner_id: self.owner_id,
            owner_type: self.owner_type.code(),
            template_id: self.template_id,
            current_phase_id: self.current_phase_id,
            plant_time: self.plant_time,
            growth_time: self.growth_time,
            phase_time: None,
            x: world.position.x,
            y: world.position.y,
            z: world.position.z,
            roll,
            pitch,
            yaw,
            item_id: self.item_id,
            house_id: self.house_id,
            parent_doodad: self.placement.parent.map(|p| p.persistent_id).unwrap_or(0),
            item_template_id: self.item_template_id,
            item_container_id: self.item_container_id(),
            data: self.data,
        }
    }

    /// Move into the terminal deleted state.
    ///
    /// The durable record (if any) is removed first; only then are observers
    /// told the object is gone and passengers unseated. A failed store delete
    /// leaves the doodad untouched so the call can be retried. Deleting twice
    /// is a no-op.
    pub fn delete(&mut self, broadcaster: &dyn ObserverBroadcaster) -> Result<(), PersistError> {
        if self.deleted {
            return Ok(());
        }

        if self.db_id > 0 {
            let persistence = self
                .persistence
                .as_ref()
                .ok_or(PersistError::Unbound(self.object_id))?;
            persistence.store().delete(self.db_id)?;
            log::debug!("Doodad {} deleted durable record {}", self.object_id, self.db_id);
        }

        self.deleted = true;
        self.override_phase = None;
        self.to_phase_and_use = false;

        for observer in self.visibility.drain() {
            broadcaster.notify_removed(self.object_id, observer);
        }
        if let Some(seat) = self.seat.as_mut() {
            seat.clear();
        }
        Ok(())
    }
}
