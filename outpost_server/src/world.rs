// World state and rules for the real-time conquest variant.
//
// The `World` owns the tile grid and one `PlayerArmy` per slot. Every
// operation validates against the current state and returns a `RuleError` on
// rejection; nothing here does I/O or knows about connections. Randomness is
// injected so map generation and the periodic event draw are reproducible in
// tests.
//
// Tiles record terrain and buildings only. Units live in the per-owner lists
// and do not occupy tiles, so they may stack; movement is still gated on the
// destination tile being Empty.

use std::time::{Duration, Instant};

use rand::Rng;

use outpost_protocol::snapshot::{
    BuildingSnapshot, PlayerSnapshot, Position, UnitSnapshot, WorldSnapshot,
};
use outpost_protocol::types::{PlayerId, TileKind, UnitKind, WorldEvent};

use crate::config::{EventWeights, ServerConfig, UnitStats};
use crate::error::RuleError;

/// Per-owner live-entity caps.
pub const MAX_UNITS: usize = 100;
pub const MAX_BUILDINGS: usize = 50;

/// Hit points of a freshly placed base.
pub const BASE_HP: i32 = 100;

#[derive(Clone, Debug)]
pub struct Unit {
    pub id: u32,
    pub owner: PlayerId,
    pub kind: UnitKind,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub moving: bool,
}

#[derive(Clone, Debug)]
pub struct Building {
    pub id: u32,
    pub owner: PlayerId,
    pub kind: TileKind,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
}

/// Everything one owner has in the world. Entity sequence counters are
/// monotonic for the lifetime of the connection so identities are never
/// reused, even after removals.
#[derive(Clone, Debug)]
pub struct PlayerArmy {
    pub id: PlayerId,
    /// Claimed country number, 0 while unset.
    pub country: u32,
    pub base: Option<(i32, i32)>,
    pub units: Vec<Unit>,
    pub buildings: Vec<Building>,
    next_unit_seq: u32,
    next_building_seq: u32,
}

impl PlayerArmy {
    fn new(id: PlayerId) -> Self {
        Self {
            id,
            country: 0,
            base: None,
            units: Vec::new(),
            buildings: Vec::new(),
            next_unit_seq: 0,
            next_building_seq: 0,
        }
    }

    /// True while the owner's base stands (placed and not destroyed).
    fn base_alive(&self) -> bool {
        self.base.is_some()
            && self
                .buildings
                .iter()
                .any(|b| b.kind == TileKind::Base && b.hp > 0)
    }
}

/// Entity identity: owner in the high half, per-owner sequence in the low.
fn entity_id(owner: PlayerId, seq: u32) -> u32 {
    (u32::from(owner.0) << 16) | (seq & 0xFFFF)
}

pub struct World {
    width: usize,
    height: usize,
    map: Vec<Vec<TileKind>>,
    players: Vec<PlayerArmy>,
    event: WorldEvent,
    last_event_draw: Instant,
    /// Latched once two bases stand at the same time; gates the victory
    /// check so a lone early base never wins by default.
    ever_two_bases: bool,
}

impl World {
    /// Generate a fresh world from the configured dimensions and resource
    /// density, with one empty army per slot.
    pub fn new(config: &ServerConfig, rng: &mut impl Rng) -> Self {
        let mut world = Self {
            width: config.map_width,
            height: config.map_height,
            map: Vec::new(),
            players: (0..config.max_players)
                .map(|i| {
                    #[expect(clippy::cast_possible_truncation)]
                    PlayerArmy::new(PlayerId(i as u8))
                })
                .collect(),
            event: WorldEvent::None,
            last_event_draw: Instant::now(),
            ever_two_bases: false,
        };
        world.map = world.generate_map(config.resource_tile_pct, rng);
        world
    }

    fn generate_map(&self, resource_pct: u32, rng: &mut impl Rng) -> Vec<Vec<TileKind>> {
        (0..self.height)
            .map(|_| {
                (0..self.width)
                    .map(|_| {
                        if rng.random_range(0..100) < resource_pct {
                            TileKind::Resource
                        } else {
                            TileKind::Empty
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn tile(&self, x: i32, y: i32) -> TileKind {
        self.map[y as usize][x as usize]
    }

    fn set_tile(&mut self, x: i32, y: i32, kind: TileKind) {
        self.map[y as usize][x as usize] = kind;
    }

    pub fn army(&self, id: PlayerId) -> &PlayerArmy {
        &self.players[id.index()]
    }

    /// Place the owner's base. One per owner, on an in-bounds Empty tile.
    pub fn place_base(&mut self, id: PlayerId, x: i32, y: i32) -> Result<(), RuleError> {
        if self.players[id.index()].base.is_some()
            || self.players[id.index()].buildings.len() >= MAX_BUILDINGS
            || !self.in_bounds(x, y)
            || self.tile(x, y) != TileKind::Empty
        {
            return Err(RuleError::PlaceBase);
        }
        self.set_tile(x, y, TileKind::Base);
        let army = &mut self.players[id.index()];
        let seq = army.next_building_seq;
        army.next_building_seq += 1;
        army.base = Some((x, y));
        army.buildings.push(Building {
            id: entity_id(id, seq),
            owner: id,
            kind: TileKind::Base,
            x,
            y,
            hp: BASE_HP,
        });
        if self.players.iter().filter(|p| p.base_alive()).count() >= 2 {
            self.ever_two_bases = true;
        }
        Ok(())
    }

    /// Spawn a unit on the first Empty tile in the base's 3x3 neighborhood,
    /// scanned row-major.
    pub fn produce_unit(
        &mut self,
        id: PlayerId,
        kind: UnitKind,
        stats: UnitStats,
    ) -> Result<u32, RuleError> {
        let (bx, by) = self.players[id.index()].base.ok_or(RuleError::Produce)?;
        if self.players[id.index()].units.len() >= MAX_UNITS {
            return Err(RuleError::Produce);
        }
        let mut spawn = None;
        'scan: for dy in -1..=1 {
            for dx in -1..=1 {
                let (x, y) = (bx + dx, by + dy);
                if self.in_bounds(x, y) && self.tile(x, y) == TileKind::Empty {
                    spawn = Some((x, y));
                    break 'scan;
                }
            }
        }
        let (x, y) = spawn.ok_or(RuleError::Produce)?;
        let army = &mut self.players[id.index()];
        let seq = army.next_unit_seq;
        army.next_unit_seq += 1;
        let unit_id = entity_id(id, seq);
        army.units.push(Unit {
            id: unit_id,
            owner: id,
            kind,
            x,
            y,
            hp: stats.hp,
            attack: stats.attack,
            defense: stats.defense,
            moving: false,
        });
        Ok(unit_id)
    }

    /// Move an owned unit one step (Manhattan distance exactly 1) onto an
    /// Empty tile.
    pub fn move_unit(&mut self, id: PlayerId, unit_id: u32, x: i32, y: i32) -> Result<(), RuleError> {
        if !self.in_bounds(x, y) || self.tile(x, y) != TileKind::Empty {
            return Err(RuleError::Move);
        }
        let unit = self.players[id.index()]
            .units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or(RuleError::Move)?;
        if (unit.x - x).abs() + (unit.y - y).abs() != 1 {
            return Err(RuleError::Move);
        }
        unit.x = x;
        unit.y = y;
        unit.moving = true;
        Ok(())
    }

    /// Resolve one attack. The target may be any other owner's unit or
    /// building at Manhattan distance exactly 1 from the attacker; damage is
    /// at least 1 regardless of defense. Dead entities are removed by
    /// swap-remove; a destroyed building also clears its tile.
    pub fn attack_unit(
        &mut self,
        id: PlayerId,
        attacker_id: u32,
        target_id: u32,
    ) -> Result<(), RuleError> {
        let attacker = self.players[id.index()]
            .units
            .iter()
            .find(|u| u.id == attacker_id)
            .ok_or(RuleError::Attack)?;
        let (ax, ay, atk) = (attacker.x, attacker.y, attacker.attack);

        // Every army is a valid target, the requester's own included; a unit
        // can never target itself because distance 0 fails the adjacency
        // check.
        for army_index in 0..self.players.len() {
            if let Some(i) = self.players[army_index]
                .units
                .iter()
                .position(|u| u.id == target_id)
            {
                let target = &mut self.players[army_index].units[i];
                if (target.x - ax).abs() + (target.y - ay).abs() != 1 {
                    return Err(RuleError::Attack);
                }
                target.hp -= (atk - target.defense).max(1);
                if target.hp <= 0 {
                    self.players[army_index].units.swap_remove(i);
                }
                return Ok(());
            }
            if let Some(i) = self.players[army_index]
                .buildings
                .iter()
                .position(|b| b.id == target_id)
            {
                let target = &mut self.players[army_index].buildings[i];
                if (target.x - ax).abs() + (target.y - ay).abs() != 1 {
                    return Err(RuleError::Attack);
                }
                target.hp -= atk.max(1);
                if target.hp <= 0 {
                    let (x, y) = (target.x, target.y);
                    self.players[army_index].buildings.swap_remove(i);
                    self.set_tile(x, y, TileKind::Empty);
                }
                return Ok(());
            }
        }
        Err(RuleError::Attack)
    }

    /// Claim a country number for the owner. Numbers run 1..=capacity and
    /// are exclusive among the current armies.
    pub fn set_country(&mut self, id: PlayerId, country: u32) -> Result<(), RuleError> {
        if country == 0
            || country as usize > self.players.len()
            || self.players.iter().any(|p| p.id != id && p.country == country)
        {
            return Err(RuleError::CountryUnavailable);
        }
        self.players[id.index()].country = country;
        Ok(())
    }

    /// Advance the world clock. Redraws the weighted event once per
    /// `interval`; returns the drawn code when a draw happened this tick.
    pub fn tick(
        &mut self,
        now: Instant,
        rng: &mut impl Rng,
        interval: Duration,
        weights: EventWeights,
    ) -> Option<WorldEvent> {
        if now.duration_since(self.last_event_draw) < interval {
            return None;
        }
        self.last_event_draw = now;
        let roll = rng.random_range(0..100u32);
        self.event = if roll < weights.earthquake {
            WorldEvent::Earthquake
        } else if roll < weights.earthquake + weights.blackout {
            WorldEvent::Blackout
        } else {
            WorldEvent::None
        };
        Some(self.event)
    }

    /// Victory check: the match ends when exactly one base stands, but only
    /// after at least two stood at once.
    pub fn winner(&self) -> Option<PlayerId> {
        if !self.ever_two_bases {
            return None;
        }
        let mut alive = self.players.iter().filter(|p| p.base_alive());
        match (alive.next(), alive.next()) {
            (Some(p), None) => Some(p.id),
            _ => None,
        }
    }

    /// Full authoritative snapshot. Owners without a placed base are
    /// omitted from the player list.
    pub fn snapshot(&self, player_count: u32) -> WorldSnapshot {
        WorldSnapshot {
            player_count,
            event: self.event,
            players: self
                .players
                .iter()
                .filter_map(|p| {
                    let (bx, by) = p.base?;
                    Some(PlayerSnapshot {
                        player_id: p.id,
                        country: p.country,
                        base: Position { x: bx, y: by },
                        units: p
                            .units
                            .iter()
                            .map(|u| UnitSnapshot {
                                unit_id: u.id,
                                owner_id: u.owner,
                                kind: u.kind,
                                x: u.x,
                                y: u.y,
                                hp: u.hp,
                                moving: u.moving,
                            })
                            .collect(),
                        buildings: p
                            .buildings
                            .iter()
                            .map(|b| BuildingSnapshot {
                                building_id: b.id,
                                owner_id: b.owner,
                                kind: b.kind,
                                x: b.x,
                                y: b.y,
                                hp: b.hp,
                            })
                            .collect(),
                    })
                })
                .collect(),
            map: self
                .map
                .iter()
                .map(|row| row.iter().map(|t| t.code()).collect())
                .collect(),
        }
    }

    /// Erase one owner's presence: clear their building tiles and reset the
    /// army. Called when a slot is released so a reclaimed slot starts
    /// clean.
    pub fn clear_player(&mut self, id: PlayerId) {
        let tiles: Vec<(i32, i32)> = self.players[id.index()]
            .buildings
            .iter()
            .map(|b| (b.x, b.y))
            .collect();
        for (x, y) in tiles {
            self.set_tile(x, y, TileKind::Empty);
        }
        self.players[id.index()] = PlayerArmy::new(id);
    }

    /// Full reset after a finished match: fresh map, empty armies,
    /// connections untouched by design of the caller.
    pub fn reset(&mut self, resource_pct: u32, rng: &mut impl Rng) {
        self.map = self.generate_map(resource_pct, rng);
        for army in &mut self.players {
            *army = PlayerArmy::new(army.id);
        }
        self.event = WorldEvent::None;
        self.last_event_draw = Instant::now();
        self.ever_two_bases = false;
    }
}
