// World snapshot payloads for the real-time variant's `update_state` record.
//
// A snapshot is the full authoritative world: session counters, the current
// event code, per-owner records (base position, unit list, building list),
// and the tile grid as a 2-D array of numeric tile-kind codes. Clients that
// join late or suspect drift can request one at any time; the server also
// broadcasts one per tick.

use serde::{Deserialize, Serialize};

use crate::types::{PlayerId, TileKind, UnitKind, WorldEvent};

/// A map coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// One unit as seen on the wire. Combat stats beyond hp stay server-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub unit_id: u32,
    pub owner_id: PlayerId,
    pub kind: UnitKind,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub moving: bool,
}

/// One building as seen on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub building_id: u32,
    pub owner_id: PlayerId,
    pub kind: TileKind,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
}

/// Per-owner world record. Only owners with a placed base appear in a
/// snapshot's player list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub country: u32,
    pub base: Position,
    pub units: Vec<UnitSnapshot>,
    pub buildings: Vec<BuildingSnapshot>,
}

/// The full authoritative world state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub player_count: u32,
    pub event: WorldEvent,
    pub players: Vec<PlayerSnapshot>,
    /// Row-major grid of tile-kind codes (see [`TileKind::code`]).
    pub map: Vec<Vec<u8>>,
}
