//! Server-to-client doodad payloads

use chrono::{DateTime, Utc};
use doodad_core::ObjectId;
use doodad_engine::Doodad;

use crate::stream::PacketStream;

/// Opcode of the creation snapshot
pub const SC_DOODAD_CREATED: u16 = 0x00C9;
/// Opcode of the phase notification
pub const SC_DOODAD_PHASE_CHANGED: u16 = 0x00CA;
/// Opcode of the removal notification
pub const SC_DOODAD_REMOVED: u16 = 0x00CB;

/// A payload that knows its opcode and layout
pub trait Packet {
    /// Wire opcode
    const OPCODE: u16;

    /// Name for logging
    fn name(&self) -> &'static str;

    /// Append the payload
    fn write(&self, stream: &mut PacketStream);

    /// Encode into an outgoing packet
    fn encode(&self) -> OutgoingPacket {
        let mut stream = PacketStream::with_capacity(64);
        self.write(&mut stream);
        OutgoingPacket {
            opcode: Self::OPCODE,
            name: self.name(),
            payload: stream.into_bytes(),
        }
    }
}

/// An encoded payload waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPacket {
    pub opcode: u16,
    pub name: &'static str,
    pub payload: Vec<u8>,
}

/// Full creation snapshot of a doodad
pub struct DoodadCreatedPacket<'a> {
    doodad: &'a Doodad,
    now: DateTime<Utc>,
}

impl<'a> DoodadCreatedPacket<'a> {
    /// Snapshot `doodad`; `now` drives the remaining growth time
    pub fn new(doodad: &'a Doodad, now: DateTime<Utc>) -> Self {
        Self { doodad, now }
    }
}

impl Packet for DoodadCreatedPacket<'_> {
    const OPCODE: u16 = SC_DOODAD_CREATED;

    fn name(&self) -> &'static str {
        "SCDoodadCreated"
    }

    fn write(&self, stream: &mut PacketStream) {
        let d = self.doodad;
        let parent = d.parent_obj_id();

        stream
            .write_bc(d.object_id())
            .write_u32(d.template_id())
            .write_bc(d.owner_obj_id)
            .write_bc(parent)
            .write_u8(d.attach_point.0);

        // Attached objects are described relative to their parent
        let transform = if d.attach_point.is_attached() || !parent.is_none() {
            d.local_transform()
        } else {
            d.world_transform()
        };
        let (roll, pitch, yaw) = transform.roll_pitch_yaw_shorts();
        stream
            .write_position(transform.position)
            .write_i16(roll)
            .write_i16(pitch)
            .write_i16(yaw);

        stream
            .write_f32(d.scale())
            .write_bool(false) // loot flag
            .write_u32(d.current_phase_id())
            .write_u32(d.owner_id)
            .write_u64(d.ucc_id)
            .write_u32(d.item_template_id)
            .write_u32(0)
            .write_u32(d.time_left(self.now))
            .write_time(d.plant_time)
            .write_u32(d.quest_glow)
            .write_i32(0) // family
            .write_i32(-1) // puzzle group
            .write_u8(d.owner_type.code())
            .write_u32(d.house_id)
            .write_i32(d.data());
    }
}

/// Phase notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoodadPhaseChangedPacket {
    pub object_id: ObjectId,
    pub phase_id: u32,
    pub time_left: u32,
}

impl DoodadPhaseChangedPacket {
    /// Describe `doodad`'s current phase at `now`
    pub fn from_doodad(doodad: &Doodad, now: DateTime<Utc>) -> Self {
        Self {
            object_id: doodad.object_id(),
            phase_id: doodad.current_phase_id(),
            time_left: doodad.time_left(now),
        }
    }
}

impl Packet for DoodadPhaseChangedPacket {
    const OPCODE: u16 = SC_DOODAD_PHASE_CHANGED;

    fn name(&self) -> &'static str {
        "SCDoodadPhaseChanged"
    }

    fn write(&self, stream: &mut PacketStream) {
        stream
            .write_bc(self.object_id)
            .write_u32(self.phase_id)
            .write_u32(self.time_left);
    }
}

/// Removal notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoodadRemovedPacket {
    pub object_id: ObjectId,
}

impl Packet for DoodadRemovedPacket {
    const OPCODE: u16 = SC_DOODAD_REMOVED;

    fn name(&self) -> &'static str {
        "SCDoodadRemoved"
    }

    fn write(&self, stream: &mut PacketStream) {
        stream.write_bc(self.object_id);
    }
}
