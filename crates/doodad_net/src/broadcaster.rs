//! Channel-backed observer delivery
//!
//! Each connected character owns a bounded channel. Notifications are
//! encoded once and pushed with `try_send`; a full channel drops the packet
//! and a disconnected receiver drops the session.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use doodad_core::{CharacterId, Clock, ObjectId, SystemClock};
use doodad_engine::{Doodad, ObserverBroadcaster};
use parking_lot::RwLock;

use crate::packets::{
    DoodadCreatedPacket, DoodadPhaseChangedPacket, DoodadRemovedPacket, OutgoingPacket, Packet,
};

/// Configuration for the broadcaster
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Packets buffered per character before drops start
    pub channel_capacity: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetStats {
    /// Packets queued for a character
    pub packets_sent: u64,
    /// Packets dropped because a channel was full
    pub packets_dropped: u64,
    /// Sessions removed because the receiver went away
    pub sessions_closed: u64,
}

/// Pushes doodad packets to connected characters
pub struct NetBroadcaster {
    config: NetConfig,
    sessions: RwLock<HashMap<CharacterId, Sender<OutgoingPacket>>>,
    clock: Arc<dyn Clock>,
    stats: RwLock<NetStats>,
}

impl NetBroadcaster {
    /// Create a broadcaster
    pub fn new(config: NetConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            clock: Arc::new(SystemClock),
            stats: RwLock::new(NetStats::default()),
        }
    }

    /// Replace the clock used for time-left fields
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a character and return its packet feed. Reconnecting
    /// replaces the previous feed
    pub fn connect(&self, character: CharacterId) -> Receiver<OutgoingPacket> {
        let (sender, receiver) = bounded(self.config.channel_capacity);
        self.sessions.write().insert(character, sender);
        log::debug!("Character {} connected", character);
        receiver
    }

    /// Forget a character
    pub fn disconnect(&self, character: CharacterId) {
        if self.sessions.write().remove(&character).is_some() {
            log::debug!("Character {} disconnected", character);
        }
    }

    pub fn is_connected(&self, character: CharacterId) -> bool {
        self.sessions.read().contains_key(&character)
    }

    pub fn stats(&self) -> NetStats {
        self.stats.read().clone()
    }

    /// Queue an encoded packet for one character. Returns whether it was queued
    pub fn send_to(&self, character: CharacterId, packet: OutgoingPacket) -> bool {
        let sender = match self.sessions.read().get(&character) {
            Some(sender) => sender.clone(),
            None => return false,
        };

        match sender.try_send(packet) {
            Ok(()) => {
                self.stats.write().packets_sent += 1;
                true
            }
            Err(TrySendError::Full(packet)) => {
                log::warn!(
                    "Dropping {} for character {}: channel full",
                    packet.name,
                    character
                );
                self.stats.write().packets_dropped += 1;
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.sessions.write().remove(&character);
                self.stats.write().sessions_closed += 1;
                false
            }
        }
    }
}

impl Default for NetBroadcaster {
    fn default() -> Self {
        Self::new(NetConfig::default())
    }
}

impl ObserverBroadcaster for NetBroadcaster {
    fn broadcast_phase_changed(&self, doodad: &Doodad, include_self: bool) {
        let packet = DoodadPhaseChangedPacket::from_doodad(doodad, self.clock.now()).encode();

        let mut recipients: BTreeSet<CharacterId> = doodad.visibility().iter().collect();
        if include_self && doodad.owner_id != 0 {
            recipients.insert(doodad.owner_id);
        }
        for character in recipients {
            self.send_to(character, packet.clone());
        }
    }

    fn notify_created(&self, doodad: &Doodad, observer: CharacterId) {
        let packet = DoodadCreatedPacket::new(doodad, self.clock.now()).encode();
        self.send_to(observer, packet);
    }

    fn notify_removed(&self, object_id: ObjectId, observer: CharacterId) {
        self.send_to(observer, DoodadRemovedPacket { object_id }.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_to_unknown_character() {
        let net = NetBroadcaster::default();
        assert!(!net.send_to(
            9,
            DoodadRemovedPacket {
                object_id: ObjectId::new(1)
            }
            .encode()
        ));
    }

    #[test]
    fn test_full_channel_drops() {
        let net = NetBroadcaster::new(NetConfig {
            channel_capacity: 1,
        });
        let rx = net.connect(1);
        let packet = DoodadRemovedPacket {
            object_id: ObjectId::new(1),
        }
        .encode();

        assert!(net.send_to(1, packet.clone()));
        assert!(!net.send_to(1, packet));
        assert_eq!(rx.len(), 1);
        assert_eq!(net.stats().packets_dropped, 1);
    }

    #[test]
    fn test_disconnected_receiver_closes_session() {
        let net = NetBroadcaster::default();
        drop(net.connect(3));
        let packet = DoodadRemovedPacket {
            object_id: ObjectId::new(1),
        }
        .encode();

        assert!(!net.send_to(3, packet));
        assert!(!net.is_connected(3));
        assert_eq!(net.stats().sessions_closed, 1);
    }
}
