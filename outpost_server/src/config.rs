// Server configuration.
//
// All tunables live here: network cadence (tick, heartbeat, inactivity
// timeout), game-mode capacity, and the content tables the rules engine
// consumes (unit combat stats, map generation probability, world-event
// weights). The defaults reproduce the reference deployment: 2-player
// baseball on port 7878, 1-second tick, 10-second heartbeat, 30-second
// timeout, 16x16 map with 10% resource tiles, event weights 20/20/60.

use std::time::Duration;

use outpost_protocol::types::UnitKind;

/// Which game the server hosts. One mode per process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMode {
    /// 1:1 turn-based number guessing.
    Baseball,
    /// Free-form real-time tile conquest.
    Conquest,
}

/// Combat statistics for one unit kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitStats {
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
}

/// Weighted outcome table for the periodic world-event draw. Weights are
/// percentages out of 100; the remainder is "no event".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventWeights {
    pub earthquake: u32,
    pub blackout: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub mode: GameMode,
    /// Fixed slot capacity. 2 for baseball, up to 8 for conquest.
    pub max_players: usize,
    /// Dispatcher idle timeout; drives the world tick and the monitor.
    pub tick: Duration,
    pub heartbeat_interval: Duration,
    /// Inactivity threshold after which a slot is evicted.
    pub idle_timeout: Duration,
    /// Consecutive send failures tolerated before a slot is evicted.
    pub max_retries: u32,
    /// Delay between a finished baseball match and the automatic reset.
    pub reset_delay: Duration,
    pub map_width: usize,
    pub map_height: usize,
    /// Percent chance (0-100) that a generated tile is a resource.
    pub resource_tile_pct: u32,
    /// Minimum spacing between world-event draws.
    pub event_interval: Duration,
    pub event_weights: EventWeights,
    /// Indexed by `UnitKind`: Worker, Soldier, Tank, Drone.
    pub unit_stats: [UnitStats; 4],
}

impl ServerConfig {
    /// Reference configuration for the guessing variant.
    pub fn baseball() -> Self {
        Self {
            port: 7878,
            mode: GameMode::Baseball,
            max_players: 2,
            tick: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            max_retries: 3,
            reset_delay: Duration::from_secs(5),
            map_width: 16,
            map_height: 16,
            resource_tile_pct: 10,
            event_interval: Duration::from_secs(10),
            event_weights: EventWeights {
                earthquake: 20,
                blackout: 20,
            },
            unit_stats: DEFAULT_UNIT_STATS,
        }
    }

    /// Reference configuration for the real-time variant.
    pub fn conquest() -> Self {
        Self {
            mode: GameMode::Conquest,
            max_players: 8,
            ..Self::baseball()
        }
    }

    /// Combat stats for one unit kind.
    pub fn stats_for(&self, kind: UnitKind) -> UnitStats {
        self.unit_stats[kind as usize]
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::baseball()
    }
}

/// Reference stat table: Worker, Soldier, Tank, Drone.
pub const DEFAULT_UNIT_STATS: [UnitStats; 4] = [
    UnitStats {
        hp: 30,
        attack: 5,
        defense: 2,
    },
    UnitStats {
        hp: 50,
        attack: 10,
        defense: 5,
    },
    UnitStats {
        hp: 100,
        attack: 20,
        defense: 15,
    },
    UnitStats {
        hp: 20,
        attack: 15,
        defense: 1,
    },
];
