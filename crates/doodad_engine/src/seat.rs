//! Vehicle seats

use doodad_core::ObjectId;

/// Seats a doodad offers to passengers (carriages, boats, siege engines)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleSeat {
    slots: Vec<Option<ObjectId>>,
}

impl VehicleSeat {
    /// Create `count` empty seats
    pub fn with_slots(count: usize) -> Self {
        Self {
            slots: vec![None; count],
        }
    }

    /// Number of seats
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Who sits in `slot`
    pub fn occupant(&self, slot: usize) -> Option<ObjectId> {
        self.slots.get(slot).copied().flatten()
    }

    /// Seat `passenger` in `slot`. Fails if the slot is taken, does not exist
    /// or the passenger already sits elsewhere
    pub fn sit(&mut self, slot: usize, passenger: ObjectId) -> bool {
        if self.slot_of(passenger).is_some() {
            return false;
        }
        match self.slots.get_mut(slot) {
            Some(seat) if seat.is_none() => {
                *seat = Some(passenger);
                true
            }
            _ => false,
        }
    }

    /// Remove `passenger` from their seat, returning the freed slot
    pub fn stand(&mut self, passenger: ObjectId) -> Option<usize> {
        let slot = self.slot_of(passenger)?;
        self.slots[slot] = None;
        Some(slot)
    }

    /// Seat index of `passenger`
    pub fn slot_of(&self, passenger: ObjectId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(passenger))
    }

    /// Everyone seated
    pub fn passengers(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Unseat everyone, returning who was seated
    pub fn clear(&mut self) -> Vec<ObjectId> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sit_and_stand() {
        let mut seat = VehicleSeat::with_slots(2);
        let a = ObjectId::new(1);
        let b = ObjectId::new(2);

        assert!(seat.sit(0, a));
        assert!(!seat.sit(0, b), "slot taken");
        assert!(!seat.sit(1, a), "already seated");
        assert!(!seat.sit(5, b), "no such slot");
        assert!(seat.sit(1, b));

        assert_eq!(seat.occupant(1), Some(b));
        assert_eq!(seat.stand(a), Some(0));
        assert_eq!(seat.stand(a), None);
        assert_eq!(seat.passengers().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_clear() {
        let mut seat = VehicleSeat::with_slots(3);
        seat.sit(2, ObjectId::new(9));
        assert_eq!(seat.clear(), vec![ObjectId::new(9)]);
        assert_eq!(seat.passengers().count(), 0);
    }
}
