//! # doodad_net - Doodad Wire Payloads
//!
//! - **stream**: little-endian packet writer/reader
//! - **packets**: creation, phase-changed and removed payloads
//! - **broadcaster**: an `ObserverBroadcaster` delivering packets over
//!   per-character channels

pub mod broadcaster;
pub mod packets;
pub mod stream;

pub use broadcaster::*;
pub use packets::*;
pub use stream::*;

pub mod prelude {
    pub use crate::broadcaster::{NetBroadcaster, NetConfig, NetStats};
    pub use crate::packets::{
        DoodadCreatedPacket, DoodadPhaseChangedPacket, DoodadRemovedPacket, OutgoingPacket, Packet,
    };
    pub use crate::stream::{PacketReader, PacketStream, StreamError};
}
