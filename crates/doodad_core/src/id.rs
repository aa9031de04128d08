//! Identifiers and id allocation

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};
use serde::{Deserialize, Serialize};

/// Template identifier (data-authored behaviour definition)
pub type TemplateId = u32;

/// Phase identifier, i.e. a function group id
pub type PhaseId = u32;

/// Durable storage identifier. 0 means "never saved"
pub type PersistentId = u32;

/// Character identifier (database relative)
pub type CharacterId = u32;

/// Ephemeral in-world object identity.
///
/// Object ids travel on the wire as 24-bit values, so only the low 24 bits
/// are significant.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// The "no object" id
    pub const NONE: Self = Self(0);

    /// Largest id representable on the wire
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create a new object id
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Check if this is the "no object" id
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Raw destination value meaning "delete this object"
pub const DELETE_SENTINEL: i32 = -1;

/// Destination of a requested phase transition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseTarget {
    /// Enter the given phase
    Phase(PhaseId),
    /// Move into the terminal deleted state
    Delete,
}

impl PhaseTarget {
    /// Parse a raw template value. `0` (or any other non-positive value
    /// besides the sentinel) means no transition was requested.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            DELETE_SENTINEL => Some(Self::Delete),
            n if n > 0 => Some(Self::Phase(n as PhaseId)),
            _ => None,
        }
    }

    /// Raw template value for this destination
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Phase(id) => id as i32,
            Self::Delete => DELETE_SENTINEL,
        }
    }
}

impl fmt::Display for PhaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phase(id) => write!(f, "phase {}", id),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Source of durable identifiers.
///
/// Ids are handed out once and never reused.
pub trait IdAllocator: Send + Sync {
    /// Allocate the next durable id (never 0)
    fn next_id(&self) -> PersistentId;
}

/// Thread-safe monotonically increasing id allocator
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU32,
}

impl SequentialIds {
    /// Create an allocator whose first id is 1
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Create an allocator whose first id is `first` (clamped to at least 1)
    pub const fn starting_at(first: u32) -> Self {
        let first = if first == 0 { 1 } else { first };
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Make sure future ids are strictly greater than `used`.
    ///
    /// Called after loading existing records so that fresh ids never collide.
    pub fn reserve_through(&self, used: u32) {
        self.next.fetch_max(used.saturating_add(1), Ordering::Relaxed);
    }

    /// Peek at the id the next allocation will return
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIds {
    fn next_id(&self) -> PersistentId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_target_from_raw() {
        assert_eq!(PhaseTarget::from_raw(0), None);
        assert_eq!(PhaseTarget::from_raw(-1), Some(PhaseTarget::Delete));
        assert_eq!(PhaseTarget::from_raw(-7), None);
        assert_eq!(PhaseTarget::from_raw(42), Some(PhaseTarget::Phase(42)));
        assert_eq!(PhaseTarget::Delete.to_raw(), -1);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);

        ids.reserve_through(10);
        assert_eq!(ids.next_id(), 11);

        // Reserving below the cursor is a no-op
        ids.reserve_through(3);
        assert_eq!(ids.next_id(), 12);
    }

    #[test]
    fn test_starting_at_zero_is_clamped() {
        let ids = SequentialIds::starting_at(0);
        assert_eq!(ids.next_id(), 1);
    }

    #[test]
    fn test_object_id() {
        let id = ObjectId::new(5);
        assert_eq!(id.get(), 5);
        assert!(!id.is_none());
        assert!(ObjectId::NONE.is_none());
        assert_eq!(format!("{}", id), "5");
    }
}
