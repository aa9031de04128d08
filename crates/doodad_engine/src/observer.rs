//! Client notification seam and per-doodad visibility

use std::collections::BTreeSet;

use doodad_core::{CharacterId, ObjectId};

use crate::doodad::Doodad;

/// Notifies clients about doodads they can see
pub trait ObserverBroadcaster: Send + Sync {
    /// Announce the doodad's current phase to its observers, plus its owner
    /// when `include_self` is set
    fn broadcast_phase_changed(&self, doodad: &Doodad, include_self: bool);

    /// Send the creation snapshot to a new observer
    fn notify_created(&self, doodad: &Doodad, observer: CharacterId);

    /// Tell an observer the object is gone
    fn notify_removed(&self, object_id: ObjectId, observer: CharacterId);
}

/// Broadcaster that drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

impl ObserverBroadcaster for NullBroadcaster {
    fn broadcast_phase_changed(&self, _doodad: &Doodad, _include_self: bool) {}
    fn notify_created(&self, _doodad: &Doodad, _observer: CharacterId) {}
    fn notify_removed(&self, _object_id: ObjectId, _observer: CharacterId) {}
}

/// Characters currently observing a doodad
#[derive(Debug, Default, Clone)]
pub struct Visibility {
    observers: BTreeSet<CharacterId>,
}

impl Visibility {
    /// Start tracking an observer. Returns false if it was already tracked
    pub fn insert(&mut self, observer: CharacterId) -> bool {
        self.observers.insert(observer)
    }

    /// Stop tracking an observer. Returns false if it was not tracked
    pub fn remove(&mut self, observer: CharacterId) -> bool {
        self.observers.remove(&observer)
    }

    /// Whether `observer` can see the doodad
    pub fn contains(&self, observer: CharacterId) -> bool {
        self.observers.contains(&observer)
    }

    /// Observers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.observers.iter().copied()
    }

    /// Number of observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether nobody observes the doodad
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Remove and return every observer
    pub fn drain(&mut self) -> Vec<CharacterId> {
        std::mem::take(&mut self.observers).into_iter().collect()
    }
}
