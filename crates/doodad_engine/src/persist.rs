//! Durable storage seam

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use doodad_core::{
    CharacterId, IdAllocator, PersistError, PersistentId, PhaseId, TemplateId,
};
use serde::{Deserialize, Serialize};

/// Stored form of a persistent doodad.
///
/// Position and rotation are always world space; parent links are restored
/// by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoodadRecord {
    pub id: PersistentId,
    pub owner_id: CharacterId,
    pub owner_type: u8,
    pub template_id: TemplateId,
    pub current_phase_id: PhaseId,
    pub plant_time: Option<DateTime<Utc>>,
    pub growth_time: Option<DateTime<Utc>>,
    pub phase_time: Option<DateTime<Utc>>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub item_id: u64,
    pub house_id: u32,
    /// Persistent id of the parent doodad, 0 when unparented
    pub parent_doodad: PersistentId,
    pub item_template_id: u32,
    pub item_container_id: u64,
    pub data: i32,
}

/// Durable save/delete of doodad records.
///
/// Every call is a single synchronous operation; failures propagate to the
/// caller.
pub trait PersistenceGateway: Send + Sync {
    /// Insert or replace a record
    fn save(&self, record: &DoodadRecord) -> Result<(), PersistError>;

    /// Delete a record. Deleting a missing record is not an error
    fn delete(&self, id: PersistentId) -> Result<(), PersistError>;

    /// Load one record
    fn load(&self, id: PersistentId) -> Result<DoodadRecord, PersistError>;

    /// Load every record, ordered by id
    fn load_all(&self) -> Result<Vec<DoodadRecord>, PersistError>;

    /// Highest durable id held by the store, 0 when empty.
    ///
    /// Must count records that exist but cannot be decoded, so that ids
    /// handed out afterwards never overwrite them.
    fn max_id(&self) -> Result<PersistentId, PersistError> {
        Ok(self.load_all()?.iter().map(|r| r.id).max().unwrap_or(0))
    }
}

/// Gateway plus id allocator, bound to persistent doodads
#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn PersistenceGateway>,
    ids: Arc<dyn IdAllocator>,
}

impl Persistence {
    /// Bind a gateway and an id allocator
    pub fn new(store: Arc<dyn PersistenceGateway>, ids: Arc<dyn IdAllocator>) -> Self {
        Self { store, ids }
    }

    /// The storage gateway
    pub fn store(&self) -> &dyn PersistenceGateway {
        self.store.as_ref()
    }

    /// Allocate a fresh durable id
    pub fn allocate_id(&self) -> PersistentId {
        self.ids.next_id()
    }
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}
