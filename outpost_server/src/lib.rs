// Outpost server: an authoritative, stateful TCP coordinator for two small
// games sharing one framed-JSON protocol.
//
// - `config`: all tunables (ports, cadences, capacities, content tables).
// - `error`: the rule-rejection taxonomy and fatal startup errors.
// - `guess`: pure scoring for the number-guessing variant.
// - `world`: tile grid and rules for the real-time conquest variant.
// - `registry`: fixed-capacity connection slots, the only writer to sockets.
// - `session`: the game state machine tying registry and rules together.
// - `server`: listener/reader threads feeding a single-threaded event loop.

pub mod config;
pub mod error;
pub mod guess;
pub mod registry;
pub mod server;
pub mod session;
pub mod world;

pub use config::{GameMode, ServerConfig};
pub use error::{RuleError, ServerError};
pub use server::{ServerHandle, start_server};
pub use session::{GamePhase, Session};
