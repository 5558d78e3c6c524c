// Core ID and world vocabulary types for the Outpost protocol.
//
// These are lightweight types shared by `message.rs` (wire messages),
// `snapshot.rs` (world sync payloads), and the server's session/rules code.
// Player identities are server-assigned compact slot indices, stable for the
// lifetime of a connection — not UUIDs.

use serde::{Deserialize, Serialize};

/// Server-assigned player slot identity (compact u8, stable while connected).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Slot-array index for this identity.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Unit kinds for the real-time variant. Combat statistics are server
/// configuration, not part of the wire contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Worker,
    Soldier,
    Tank,
    Drone,
}

/// Map tile kinds. Snapshots carry the numeric codes (see [`TileKind::code`])
/// so the grid serializes as a compact 2-D integer array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Empty,
    Resource,
    Base,
    Tower,
}

impl TileKind {
    /// Numeric wire code used in the snapshot grid.
    pub const fn code(self) -> u8 {
        match self {
            TileKind::Empty => 0,
            TileKind::Resource => 1,
            TileKind::Base => 2,
            TileKind::Tower => 3,
        }
    }
}

/// Outcome of the periodic weighted world-event draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEvent {
    #[default]
    None,
    Earthquake,
    Blackout,
}

/// Per-recipient outcome carried in a `game_over` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Victory,
    Defeat,
}
