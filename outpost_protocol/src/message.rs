// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the server.
// - `ServerMessage`: sent by the server to game clients.
//
// Every record is internally tagged with an `action` field — the wire
// discriminator both game variants share. Commands for the real-time variant
// nest one level deeper: `{"action":"command","type":...,"payload":{...}}`,
// expressed here as the adjacently tagged [`Command`] enum.
//
// All types derive `Serialize`/`Deserialize` for JSON framing (see
// `framing.rs`).

use serde::{Deserialize, Serialize};

use crate::snapshot::WorldSnapshot;
use crate::types::{GameResult, PlayerId, UnitKind, WorldEvent};

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register a secret 3-digit number (guessing variant, Setting phase).
    SetNumber { number: String },
    /// Submit a guess (guessing variant, acting participant only).
    Guess { guess: String },
    /// Claim a country number (real-time variant lobby).
    Country { country: u32 },
    /// A world command (real-time variant).
    Command(Command),
}

/// A world command nested inside a `command` record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    /// Place the owner's base on an empty tile. One base per owner.
    PlaceBase { x: i32, y: i32 },
    /// Produce a unit next to the owner's base.
    ProduceUnit { unit_type: UnitKind },
    /// Move a unit one tile (Manhattan distance exactly 1).
    MoveUnit { unit_id: u32, x: i32, y: i32 },
    /// Attack an adjacent unit.
    AttackUnit { attacker_id: u32, target_id: u32 },
    /// Ask for a fresh world snapshot.
    RequestState,
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Slot assignment, sent immediately after accept.
    AssignId { player_id: PlayerId },
    /// Sole participant is waiting for an opponent (guessing variant).
    WaitPlayer { message: String },
    /// Both participants are present — set your secret numbers.
    GameStart { message: String },
    /// Ack of a successful secret registration.
    NumberSet { message: String },
    /// Turn notification: the recipient acts now.
    YourTurn { message: String },
    /// Turn notification: the other participant acts now.
    WaitTurn { message: String },
    /// Scoring outcome of a guess, broadcast to both participants.
    GuessResult {
        guess: String,
        strikes: u8,
        balls: u8,
        attempts: u32,
        current_player: PlayerId,
    },
    /// Ack of a successful country claim (real-time variant).
    CountryOk,
    /// Full world sync (real-time variant).
    UpdateState { state: WorldSnapshot },
    /// World-tick event notice (real-time variant).
    Event { event: WorldEvent },
    /// Termination notice. The guessing variant reveals both secrets.
    GameOver {
        result: GameResult,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        your_number: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opponent_number: Option<String>,
    },
    /// A rejected request, with a human-readable reason. State is unchanged.
    Error { message: String },
    /// Liveness probe.
    Heartbeat,
    /// Eviction notice: a participant exceeded the inactivity timeout.
    Timeout { reason: String },
}
