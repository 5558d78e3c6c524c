// outpost_protocol — wire protocol for the Outpost game server.
//
// This crate defines the message types, framing, and serialization used by
// the authoritative server (`outpost_server`) and game clients to communicate
// over TCP. It is shared between both sides and has no dependency on the
// server's rules code.
//
// Module overview:
// - `types.rs`:    Core vocabulary — `PlayerId`, `UnitKind`, `TileKind`,
//                  `WorldEvent`, `GameResult`.
// - `message.rs`:  Client-to-server and server-to-client message enums,
//                  tagged on the wire with an `action` discriminator, plus
//                  the nested `Command` enum for the real-time variant.
// - `snapshot.rs`: Full-world sync payloads for `update_state`.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  2-byte big-endian length prefix, then JSON payload,
//                  bounded by `MAX_FRAME_SIZE`.
//
// Design decisions:
// - **JSON serialization.** Human-inspectable and cheap to evolve; frames are
//   small (the 4 KB cap fits even full snapshots of a 16x16 world).
// - **`action`-tagged records.** Every payload carries its discriminator
//   inline, so a client can dispatch on one field regardless of variant.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing,
//   compatible with blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod message;
pub mod snapshot;
pub mod types;

pub use framing::{MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{ClientMessage, Command, ServerMessage};
pub use snapshot::{BuildingSnapshot, PlayerSnapshot, Position, UnitSnapshot, WorldSnapshot};
pub use types::{GameResult, PlayerId, TileKind, UnitKind, WorldEvent};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Serialize a ClientMessage to JSON, frame it, read it back, deserialize.
    fn client_roundtrip(msg: &ClientMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &json).unwrap();

        let mut cursor = Cursor::new(&wire);
        let recovered_json = read_frame(&mut cursor).unwrap();
        let recovered: ClientMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    /// Serialize a ServerMessage to JSON, frame it, read it back, deserialize.
    fn server_roundtrip(msg: &ServerMessage) {
        let json = serde_json::to_vec(msg).unwrap();
        let mut wire = Vec::new();
        write_frame(&mut wire, &json).unwrap();

        let mut cursor = Cursor::new(&wire);
        let recovered_json = read_frame(&mut cursor).unwrap();
        let recovered: ServerMessage = serde_json::from_slice(&recovered_json).unwrap();
        assert_eq!(&recovered, msg);
    }

    #[test]
    fn guess_wire_shape_is_stable() {
        let msg = ClientMessage::Guess {
            guess: "123".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"action":"guess","guess":"123"}"#);
    }

    #[test]
    fn command_wire_shape_is_stable() {
        let msg = ClientMessage::Command(Command::PlaceBase { x: 3, y: 3 });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"action":"command","type":"place_base","payload":{"x":3,"y":3}}"#
        );
    }

    #[test]
    fn request_state_has_no_payload() {
        let msg = ClientMessage::Command(Command::RequestState);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"action":"command","type":"request_state"}"#);
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn heartbeat_is_a_bare_action() {
        let json = serde_json::to_string(&ServerMessage::Heartbeat).unwrap();
        assert_eq!(json, r#"{"action":"heartbeat"}"#);
    }

    #[test]
    fn roundtrip_set_number() {
        client_roundtrip(&ClientMessage::SetNumber {
            number: "045".into(),
        });
    }

    #[test]
    fn roundtrip_country() {
        client_roundtrip(&ClientMessage::Country { country: 3 });
    }

    #[test]
    fn roundtrip_all_commands() {
        client_roundtrip(&ClientMessage::Command(Command::ProduceUnit {
            unit_type: UnitKind::Tank,
        }));
        client_roundtrip(&ClientMessage::Command(Command::MoveUnit {
            unit_id: 104,
            x: 5,
            y: 6,
        }));
        client_roundtrip(&ClientMessage::Command(Command::AttackUnit {
            attacker_id: 104,
            target_id: 201,
        }));
    }

    #[test]
    fn roundtrip_guess_result() {
        server_roundtrip(&ServerMessage::GuessResult {
            guess: "456".into(),
            strikes: 0,
            balls: 1,
            attempts: 1,
            current_player: PlayerId(0),
        });
    }

    #[test]
    fn roundtrip_game_over_with_secrets() {
        server_roundtrip(&ServerMessage::GameOver {
            result: GameResult::Victory,
            message: "you guessed it".into(),
            your_number: Some("123".into()),
            opponent_number: Some("045".into()),
        });
    }

    #[test]
    fn game_over_without_secrets_omits_fields() {
        let msg = ServerMessage::GameOver {
            result: GameResult::Defeat,
            message: "your base fell".into(),
            your_number: None,
            opponent_number: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("your_number"), "got: {json}");
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn roundtrip_update_state() {
        server_roundtrip(&ServerMessage::UpdateState {
            state: WorldSnapshot {
                player_count: 2,
                event: WorldEvent::Earthquake,
                players: vec![PlayerSnapshot {
                    player_id: PlayerId(0),
                    country: 1,
                    base: Position { x: 3, y: 3 },
                    units: vec![UnitSnapshot {
                        unit_id: 0,
                        owner_id: PlayerId(0),
                        kind: UnitKind::Worker,
                        x: 2,
                        y: 2,
                        hp: 30,
                        moving: false,
                    }],
                    buildings: vec![BuildingSnapshot {
                        building_id: 0,
                        owner_id: PlayerId(0),
                        kind: TileKind::Base,
                        x: 3,
                        y: 3,
                        hp: 100,
                    }],
                }],
                map: vec![vec![0, 1], vec![2, 0]],
            },
        });
    }

    #[test]
    fn roundtrip_turn_notifications() {
        server_roundtrip(&ServerMessage::YourTurn {
            message: "your turn".into(),
        });
        server_roundtrip(&ServerMessage::WaitTurn {
            message: "opponent's turn".into(),
        });
        server_roundtrip(&ServerMessage::Timeout {
            reason: "opponent lost connection".into(),
        });
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let err = serde_json::from_str::<ClientMessage>(r#"{"action":"launch_nukes"}"#);
        assert!(err.is_err());
    }
}
