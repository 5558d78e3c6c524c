// Session coordination: the authoritative game state machine.
//
// A `Session` owns the slot registry and, in the real-time mode, the world.
// It is single-threaded by construction: the dispatcher loop in `server.rs`
// funnels every connection, message, and tick into it from one thread, so
// there is no locking anywhere in here.
//
// The guessing variant runs the match phase machine
// (Waiting -> Setting -> Playing -> Finished -> back to Setting or Waiting)
// with strict turn alternation. The real-time variant has no phases beyond
// the world itself; its clock is the dispatcher tick. Both share the
// registry's liveness machinery: heartbeat probes, inactivity eviction, and
// send-failure eviction, all resolved on the tick.

use std::net::TcpStream;
use std::time::Instant;

use rand::Rng;
use tracing::{info, warn};

use outpost_protocol::framing::write_frame;
use outpost_protocol::message::{ClientMessage, Command, ServerMessage};
use outpost_protocol::types::{GameResult, PlayerId, WorldEvent};

use crate::config::{GameMode, ServerConfig};
use crate::error::RuleError;
use crate::guess::{number_string, parse_number, score};
use crate::registry::{Registry, SlotPhase};
use crate::world::World;

/// Match phase for the guessing variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GamePhase {
    /// Zero or one participant connected.
    #[default]
    Waiting,
    /// Both connected, secrets being registered.
    Setting,
    /// Turns alternating.
    Playing,
    /// Match decided; automatic reset pending.
    Finished,
}

pub struct Session {
    config: ServerConfig,
    registry: Registry,
    phase: GamePhase,
    current_turn: PlayerId,
    /// When set, the finished match resets at this deadline.
    reset_at: Option<Instant>,
    /// Present iff the mode is Conquest.
    world: Option<World>,
    last_heartbeat: Instant,
}

impl Session {
    pub fn new(config: ServerConfig, rng: &mut impl Rng) -> Self {
        let world = match config.mode {
            GameMode::Conquest => Some(World::new(&config, rng)),
            GameMode::Baseball => None,
        };
        Self {
            registry: Registry::new(config.max_players, config.max_retries),
            phase: GamePhase::Waiting,
            current_turn: PlayerId(0),
            reset_at: None,
            world,
            last_heartbeat: Instant::now(),
            config,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn connected_count(&self) -> usize {
        self.registry.connected_count()
    }

    /// Register a new connection. On capacity the connection gets an
    /// explanatory error and is dropped without a slot; otherwise the new
    /// participant is assigned an identity and the match advances.
    pub fn add_player(&mut self, stream: TcpStream) -> Option<PlayerId> {
        if !self.registry.has_vacancy() {
            let message = if self.config.mode == GameMode::Baseball
                && self.phase != GamePhase::Waiting
            {
                "game already in progress, try again later".to_owned()
            } else {
                "server full, try again later".to_owned()
            };
            info!("connection refused: {message}");
            let mut stream = stream;
            if let Ok(json) = serde_json::to_vec(&ServerMessage::Error { message }) {
                let _ = write_frame(&mut stream, &json);
            }
            return None;
        }

        let id = self.registry.accept(stream).ok()?;
        info!(player = id.0, "player joined");
        self.registry.send_to(id, &ServerMessage::AssignId { player_id: id });

        if self.config.mode == GameMode::Baseball {
            if self.registry.connected_count() == self.registry.capacity() {
                self.start_setting();
            } else {
                self.registry.send_to(
                    id,
                    &ServerMessage::WaitPlayer {
                        message: "waiting for an opponent".to_owned(),
                    },
                );
            }
        }
        self.drain_evictions();
        Some(id)
    }

    /// Handle a voluntary or detected disconnect.
    pub fn remove_player(&mut self, id: PlayerId) {
        if !self.registry.is_connected(id) {
            return;
        }
        self.teardown(id, true);
        self.drain_evictions();
    }

    /// Dispatch one parsed client message. Every receive refreshes the
    /// sender's activity stamp, rule rejections go back as `error` records,
    /// and actions foreign to the running mode are rejected outright.
    pub fn handle_message(&mut self, id: PlayerId, msg: ClientMessage) {
        if !self.registry.is_connected(id) {
            return;
        }
        self.registry.touch(id);

        match (self.config.mode, msg) {
            (GameMode::Baseball, ClientMessage::SetNumber { number }) => {
                self.handle_set_number(id, &number);
            }
            (GameMode::Baseball, ClientMessage::Guess { guess }) => {
                self.handle_guess(id, &guess);
            }
            (GameMode::Conquest, ClientMessage::Country { country }) => {
                self.handle_country(id, country);
            }
            (GameMode::Conquest, ClientMessage::Command(cmd)) => {
                self.handle_command(id, cmd);
            }
            _ => self.reject(id, RuleError::UnsupportedAction),
        }
        self.drain_evictions();
    }

    /// Advance time-driven machinery: heartbeat probes, inactivity
    /// eviction, the finished-match reset, and the world tick.
    pub fn on_tick(&mut self, now: Instant, rng: &mut impl Rng) {
        if now.duration_since(self.last_heartbeat) >= self.config.heartbeat_interval {
            self.last_heartbeat = now;
            for id in self.registry.connected_ids() {
                self.registry.probe(id, &ServerMessage::Heartbeat);
            }
        }

        for id in self.registry.stale(now, self.config.idle_timeout) {
            self.evict_for_timeout(id);
        }

        match self.config.mode {
            GameMode::Baseball => {
                if self.phase == GamePhase::Finished
                    && self.reset_at.is_some_and(|at| now >= at)
                {
                    self.reset_at = None;
                    self.reset_match();
                }
            }
            GameMode::Conquest => self.tick_world(now, rng),
        }

        self.drain_evictions();
    }

    fn tick_world(&mut self, now: Instant, rng: &mut impl Rng) {
        let Some(world) = self.world.as_mut() else {
            return;
        };
        if let Some(event) = world.tick(
            now,
            rng,
            self.config.event_interval,
            self.config.event_weights,
        ) && event != WorldEvent::None
        {
            self.registry.broadcast(&ServerMessage::Event { event });
        }

        if let Some(winner) = self.world.as_ref().and_then(World::winner) {
            info!(winner = winner.0, "conquest match decided");
            for id in self.registry.connected_ids() {
                let (result, message) = if id == winner {
                    (GameResult::Victory, "all rival bases destroyed".to_owned())
                } else {
                    (GameResult::Defeat, "your base has fallen".to_owned())
                };
                self.registry.send_to(
                    id,
                    &ServerMessage::GameOver {
                        result,
                        message,
                        your_number: None,
                        opponent_number: None,
                    },
                );
            }
            if let Some(world) = self.world.as_mut() {
                world.reset(self.config.resource_tile_pct, rng);
            }
            return;
        }

        #[expect(clippy::cast_possible_truncation)]
        let count = self.registry.connected_count() as u32;
        if let Some(state) = self.world.as_ref().map(|w| w.snapshot(count)) {
            self.registry.broadcast(&ServerMessage::UpdateState { state });
        }
    }

    fn handle_set_number(&mut self, id: PlayerId, number: &str) {
        if self.registry.slot(id).phase != SlotPhase::Setting {
            return self.reject(id, RuleError::NotSettingPhase);
        }
        let Some(digits) = parse_number(number) else {
            return self.reject(id, RuleError::InvalidNumber);
        };
        let slot = self.registry.slot_mut(id);
        slot.secret = Some(digits);
        slot.phase = SlotPhase::Ready;
        self.registry.send_to(
            id,
            &ServerMessage::NumberSet {
                message: "number set, waiting for your opponent".to_owned(),
            },
        );

        let everyone_ready = self
            .registry
            .connected_ids()
            .iter()
            .all(|&p| self.registry.slot(p).phase == SlotPhase::Ready);
        if everyone_ready {
            self.start_playing();
        }
    }

    fn handle_guess(&mut self, id: PlayerId, guess: &str) {
        if self.phase != GamePhase::Playing || self.registry.slot(id).phase != SlotPhase::Turn {
            return self.reject(id, RuleError::NotYourTurn);
        }
        let Some(digits) = parse_number(guess) else {
            return self.reject(id, RuleError::InvalidNumber);
        };
        let Some(opponent) = self.opponent_of(id) else {
            return;
        };
        let Some(secret) = self.registry.slot(opponent).secret else {
            return;
        };

        let outcome = score(secret, digits);
        let slot = self.registry.slot_mut(id);
        slot.attempts += 1;
        let attempts = slot.attempts;

        self.registry.broadcast(&ServerMessage::GuessResult {
            guess: number_string(digits),
            strikes: outcome.strikes,
            balls: outcome.balls,
            attempts,
            current_player: id,
        });

        if outcome.is_correct() {
            self.finish_match(id, opponent);
        } else {
            self.current_turn = opponent;
            self.start_turn();
        }
    }

    fn handle_country(&mut self, id: PlayerId, country: u32) {
        let Some(world) = self.world.as_mut() else {
            return self.reject(id, RuleError::UnsupportedAction);
        };
        match world.set_country(id, country) {
            Ok(()) => self.registry.send_to(id, &ServerMessage::CountryOk),
            Err(e) => self.reject(id, e),
        }
    }

    fn handle_command(&mut self, id: PlayerId, cmd: Command) {
        let Some(world) = self.world.as_mut() else {
            return self.reject(id, RuleError::UnsupportedAction);
        };
        // `true` means the world changed and everyone should hear about it.
        let outcome = match cmd {
            Command::PlaceBase { x, y } => world.place_base(id, x, y).map(|()| true),
            Command::ProduceUnit { unit_type } => world
                .produce_unit(id, unit_type, self.config.stats_for(unit_type))
                .map(|_| true),
            Command::MoveUnit { unit_id, x, y } => {
                world.move_unit(id, unit_id, x, y).map(|()| true)
            }
            Command::AttackUnit {
                attacker_id,
                target_id,
            } => world.attack_unit(id, attacker_id, target_id).map(|()| true),
            Command::RequestState => Ok(false),
        };

        match outcome {
            Ok(changed) => {
                #[expect(clippy::cast_possible_truncation)]
                let count = self.registry.connected_count() as u32;
                if let Some(state) = self.world.as_ref().map(|w| w.snapshot(count)) {
                    let msg = ServerMessage::UpdateState { state };
                    if changed {
                        self.registry.broadcast(&msg);
                    } else {
                        self.registry.send_to(id, &msg);
                    }
                }
            }
            Err(e) => self.reject(id, e),
        }
    }

    /// Both slots present: enter Setting and prompt for secrets.
    fn start_setting(&mut self) {
        self.phase = GamePhase::Setting;
        self.reset_at = None;
        for id in self.registry.connected_ids() {
            let slot = self.registry.slot_mut(id);
            slot.phase = SlotPhase::Setting;
            slot.secret = None;
            slot.attempts = 0;
        }
        self.registry.broadcast(&ServerMessage::GameStart {
            message: "both players connected, set your secret number".to_owned(),
        });
    }

    fn start_playing(&mut self) {
        self.phase = GamePhase::Playing;
        self.current_turn = PlayerId(0);
        self.start_turn();
    }

    /// Flip the acting sub-states and send both turn notifications.
    fn start_turn(&mut self) {
        for id in self.registry.connected_ids() {
            if id == self.current_turn {
                self.registry.slot_mut(id).phase = SlotPhase::Turn;
                self.registry.send_to(
                    id,
                    &ServerMessage::YourTurn {
                        message: "your turn, submit a guess".to_owned(),
                    },
                );
            } else {
                self.registry.slot_mut(id).phase = SlotPhase::WaitingTurn;
                self.registry.send_to(
                    id,
                    &ServerMessage::WaitTurn {
                        message: "waiting for your opponent's guess".to_owned(),
                    },
                );
            }
        }
    }

    /// Decide the match: per-recipient outcome with both secrets revealed,
    /// then schedule the automatic reset.
    fn finish_match(&mut self, winner: PlayerId, loser: PlayerId) {
        self.phase = GamePhase::Finished;
        self.reset_at = Some(Instant::now() + self.config.reset_delay);
        for id in self.registry.connected_ids() {
            self.registry.slot_mut(id).phase = SlotPhase::Waiting;
        }
        info!(winner = winner.0, "match decided");

        let winner_secret = self.registry.slot(winner).secret.map(number_string);
        let loser_secret = self.registry.slot(loser).secret.map(number_string);
        self.registry.send_to(
            winner,
            &ServerMessage::GameOver {
                result: GameResult::Victory,
                message: "you guessed the number".to_owned(),
                your_number: winner_secret.clone(),
                opponent_number: loser_secret.clone(),
            },
        );
        self.registry.send_to(
            loser,
            &ServerMessage::GameOver {
                result: GameResult::Defeat,
                message: "your opponent guessed your number".to_owned(),
                your_number: loser_secret,
                opponent_number: winner_secret,
            },
        );
    }

    /// Return the match to its pre-game state. With a full table it goes
    /// straight back to Setting; otherwise to Waiting.
    fn reset_match(&mut self) {
        self.reset_at = None;
        if self.config.mode != GameMode::Baseball {
            return;
        }
        if self.registry.connected_count() == self.registry.capacity() {
            self.start_setting();
        } else {
            self.phase = GamePhase::Waiting;
            for id in self.registry.connected_ids() {
                let slot = self.registry.slot_mut(id);
                slot.phase = SlotPhase::Waiting;
                slot.secret = None;
                slot.attempts = 0;
                self.registry.send_to(
                    id,
                    &ServerMessage::WaitPlayer {
                        message: "waiting for an opponent".to_owned(),
                    },
                );
            }
        }
    }

    /// Release a slot and settle the match around it. `notify` controls the
    /// disconnect-victory notice; timeouts use their own notification.
    fn teardown(&mut self, id: PlayerId, notify: bool) {
        let match_live = self.config.mode == GameMode::Baseball
            && matches!(self.phase, GamePhase::Setting | GamePhase::Playing);
        if notify && match_live {
            for other in self.registry.connected_ids() {
                if other != id {
                    self.registry.send_to(
                        other,
                        &ServerMessage::GameOver {
                            result: GameResult::Victory,
                            message: "your opponent disconnected".to_owned(),
                            your_number: None,
                            opponent_number: None,
                        },
                    );
                }
            }
        }
        if let Some(world) = self.world.as_mut() {
            world.clear_player(id);
        }
        self.registry.release(id);
        info!(player = id.0, "player left");
        if self.config.mode == GameMode::Baseball {
            self.reset_match();
        }
    }

    /// Inactivity eviction: a last-gasp notice to the evictee, a `timeout`
    /// record to everyone else, then a silent teardown.
    fn evict_for_timeout(&mut self, id: PlayerId) {
        warn!(player = id.0, "evicting inactive player");
        self.registry.probe(
            id,
            &ServerMessage::Timeout {
                reason: "inactive for too long".to_owned(),
            },
        );
        for other in self.registry.connected_ids() {
            if other != id {
                self.registry.send_to(
                    other,
                    &ServerMessage::Timeout {
                        reason: format!("player {} timed out", id.0),
                    },
                );
            }
        }
        self.teardown(id, false);
    }

    /// Settle slots whose sends exhausted their retries. A teardown can
    /// itself fail more sends, so drain until quiet.
    fn drain_evictions(&mut self) {
        loop {
            let evicted = self.registry.take_evictions();
            if evicted.is_empty() {
                return;
            }
            for id in evicted {
                warn!(player = id.0, "evicting unreachable player");
                self.teardown(id, true);
            }
        }
    }

    /// Send a rule rejection back to the offender. Nothing else changes.
    fn reject(&mut self, id: PlayerId, error: RuleError) {
        warn!(player = id.0, %error, "request rejected");
        self.registry.send_to(
            id,
            &ServerMessage::Error {
                message: error.to_string(),
            },
        );
    }

    fn opponent_of(&self, id: PlayerId) -> Option<PlayerId> {
        self.registry.connected_ids().into_iter().find(|&p| p != id)
    }
}
