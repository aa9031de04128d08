//! The unit driving an interaction

use doodad_core::{CharacterId, ObjectId};

/// Whoever triggered an interaction.
///
/// Effects that hit a doodad without a direct interaction run without an
/// actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Actor {
    /// In-world object id of the unit
    pub object_id: ObjectId,
    /// Character id, 0 for non-player units
    pub character_id: CharacterId,
}

impl Actor {
    /// A player character
    pub fn character(object_id: ObjectId, character_id: CharacterId) -> Self {
        Self {
            object_id,
            character_id,
        }
    }

    /// A non-player unit
    pub fn npc(object_id: ObjectId) -> Self {
        Self {
            object_id,
            character_id: 0,
        }
    }

    /// Whether this actor is a player character
    pub fn is_character(&self) -> bool {
        self.character_id != 0
    }
}
