//! Networking primitives.
//!
//! Goals:
//! - Define every message exchanged between server and client.
//! - Keep serialization explicit (`serde_json` into `Bytes`).
//! - Hide the transport behind [`MessageChannel`]; sockets live outside this
//!   workspace, the in-process [`LoopbackChannel`] serves listen servers and
//!   tests.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{angle::MessageAngle, items::WEAPON_COUNT, math::Vec3};

/// Protocol version for compatibility checks.
pub const PROTOCOL_VERSION: u32 = 1;

/// Queue depth of one loopback direction.
const LOOPBACK_CAPACITY: usize = 256;

static NEXT_CLIENT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl ClientId {
    pub fn new_unique() -> Self {
        ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Replicated entity id. Ids are reused by the server after a death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u16);

bitflags::bitflags! {
    /// Keys held by a player.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KeysMask: u32 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
    }
}

/// High-level message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NetMsg {
    // ─── Session ───
    Hello { protocol: u32 },
    Welcome { client_id: ClientId },
    /// Server tells client which map to load.
    MapChange { map_name: String },
    Disconnect { reason: String },

    // ─── Player ───
    /// Client -> server: latest movement input.
    PlayerMove(PlayerMove),
    /// Server -> client: inventory and vitals.
    PlayerState(PlayerState),
    /// Server -> client: authoritative position.
    PlayerPosition(PlayerPosition),

    // ─── Map replication ───
    WallPosition(WallPosition),
    EntityBirth(EntityBirth),
    EntityState(EntityState),
    EntityDeath(EntityDeath),

    // ─── Console ───
    /// Server -> client: print message to console.
    ServerPrint { message: String },
    /// Client -> server: console command (e.g. "noclip 1").
    ClientCommand { command: String },
}

/// Movement input for one tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PlayerMove {
    /// 0 = stand still, 255 = full acceleration.
    pub acceleration: u8,
    /// Direction of movement in the map plane.
    pub angle: MessageAngle,
    pub jump_pressed: bool,
}

/// Vitals and inventory snapshot of one player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PlayerState {
    pub ammo: [u32; WEAPON_COUNT],
    pub health: u32,
    pub armor: u32,
    pub keys_mask: u32,
}

impl PlayerState {
    pub fn keys(&self) -> KeysMask {
        KeysMask::from_bits_truncate(self.keys_mask)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PlayerPosition {
    pub position: Vec3,
    pub speed: Vec3,
}

/// New position of one dynamic wall, in 1/256 world-unit fixed point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WallPosition {
    pub wall_index: u32,
    pub vertices_xy: [[i16; 2]; 2],
    pub z: i16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EntityBirth {
    pub id: EntityId,
    /// Item/model id in the resource catalog.
    pub item_id: u16,
    pub position: Vec3,
    pub angle: MessageAngle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EntityState {
    pub id: EntityId,
    pub position: Vec3,
    pub angle: MessageAngle,
    /// Animation frame.
    pub frame: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityDeath {
    pub id: EntityId,
}

pub fn encode_to_bytes(msg: &NetMsg) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<NetMsg> {
    serde_json::from_slice(b).context("deserialize")
}

/// One end of an ordered message stream.
///
/// Receiving never blocks: the tick loop drains whatever has arrived.
#[async_trait]
pub trait MessageChannel: Send {
    async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()>;

    /// Queues a message without waiting. Fails when the peer is gone or its
    /// queue is full.
    fn try_send(&mut self, msg: &NetMsg) -> anyhow::Result<()>;

    /// Returns the next queued message, if any.
    fn try_recv(&mut self) -> anyhow::Result<Option<NetMsg>>;
}

/// In-process channel. Messages travel encoded, like they would on a wire.
#[derive(Debug)]
pub struct LoopbackChannel {
    tx: mpsc::Sender<Bytes>,
    rx: mpsc::Receiver<Bytes>,
}

/// Creates two connected ends.
pub fn loopback_pair() -> (LoopbackChannel, LoopbackChannel) {
    let (a_tx, b_rx) = mpsc::channel(LOOPBACK_CAPACITY);
    let (b_tx, a_rx) = mpsc::channel(LOOPBACK_CAPACITY);
    (
        LoopbackChannel { tx: a_tx, rx: a_rx },
        LoopbackChannel { tx: b_tx, rx: b_rx },
    )
}

#[async_trait]
impl MessageChannel for LoopbackChannel {
    async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = encode_to_bytes(msg)?;
        self.tx
            .send(payload)
            .await
            .map_err(|_| anyhow::anyhow!("loopback peer closed"))
    }

    fn try_send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = encode_to_bytes(msg)?;
        match self.tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                anyhow::bail!("loopback queue full ({LOOPBACK_CAPACITY} messages)")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => anyhow::bail!("loopback peer closed"),
        }
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<NetMsg>> {
        match self.rx.try_recv() {
            Ok(payload) => decode_from_bytes(&payload).map(Some),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                anyhow::bail!("loopback peer closed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_position_roundtrip_bytes() {
        let msg = NetMsg::WallPosition(WallPosition {
            wall_index: 3,
            vertices_xy: [[-256, 512], [768, i16::MAX]],
            z: -12,
        });
        let bytes = encode_to_bytes(&msg).unwrap();
        assert_eq!(decode_from_bytes(&bytes).unwrap(), msg);
    }

    #[test]
    fn keys_mask_bits() {
        let state = PlayerState {
            keys_mask: 0b101,
            ..Default::default()
        };
        assert_eq!(state.keys(), KeysMask::RED | KeysMask::BLUE);
        assert_eq!(KeysMask::GREEN.bits(), 2);
    }

    #[tokio::test]
    async fn loopback_delivers_in_order() -> anyhow::Result<()> {
        let (mut a, mut b) = loopback_pair();
        assert_eq!(b.try_recv()?, None);

        a.send(&NetMsg::Hello {
            protocol: PROTOCOL_VERSION,
        })
        .await?;
        a.send(&NetMsg::EntityDeath(EntityDeath { id: EntityId(4) }))
            .await?;

        assert_eq!(
            b.try_recv()?,
            Some(NetMsg::Hello {
                protocol: PROTOCOL_VERSION
            })
        );
        assert_eq!(
            b.try_recv()?,
            Some(NetMsg::EntityDeath(EntityDeath { id: EntityId(4) }))
        );
        assert_eq!(b.try_recv()?, None);
        Ok(())
    }

    #[tokio::test]
    async fn try_send_fails_once_queue_is_full() -> anyhow::Result<()> {
        let (mut a, mut b) = loopback_pair();
        let msg = NetMsg::EntityDeath(EntityDeath { id: EntityId(1) });
        for _ in 0..LOOPBACK_CAPACITY {
            a.try_send(&msg)?;
        }
        assert!(a.try_send(&msg).is_err());

        assert_eq!(b.try_recv()?, Some(msg.clone()));
        a.try_send(&msg)?;
        Ok(())
    }

    #[tokio::test]
    async fn loopback_reports_closed_peer() {
        let (mut a, b) = loopback_pair();
        drop(b);
        assert!(a.send(&NetMsg::Hello { protocol: 1 }).await.is_err());
        assert!(a.try_send(&NetMsg::Hello { protocol: 1 }).is_err());
        assert!(a.try_recv().is_err());
    }
}
