/// WorldState: the complete snapshot of a running game.
///
/// ## Tile layers
///   - `base`: the tiles as generated. Never mutated after generation.
///   - `map`: the live map. Nothing mutates it during play today, but
///     `reset_level` always restores it from `base`.
///
/// ## Spawn records
///   Guard kinds and cells plus the player cell are recorded at generation.
///   `reset_level` rebuilds every actor from them, so a guard that was
///   converted by a distraction comes back in the variant it spawned as.
///
/// ## Clock
///   `now_ms` is simulation time, advanced by `tick_rate_ms` per step.
///   Every timed rule (idle pauses, bomb lifetimes, cooldowns) reads it.

use log::info;
use rand::Rng;

use crate::config::GameConfig;
use crate::domain::distraction::DistractionEffect;
use crate::domain::entity::{Player, PlayerTuning};
use crate::domain::geom::Cell;
use crate::domain::guard::{Guard, GuardKind, GuardTuning};
use crate::domain::map::{TileMap, TileSnapshot};
use crate::domain::tile::LevelVariant;
use super::generator::{self, GeneratorParams};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Spotted,
    Escaped,
}

/// Everything the world needs from config, resolved once.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldSettings {
    pub variant: LevelVariant,
    pub generator: GeneratorParams,
    pub guard: GuardTuning,
    pub player: PlayerTuning,
    pub standing_guards: usize,
    pub moving_guards: usize,
    pub tick_rate_ms: u64,
    pub lure_radius: f64,
}

impl WorldSettings {
    pub fn from_config(cfg: &GameConfig) -> Self {
        WorldSettings {
            variant: cfg.level.variant,
            generator: GeneratorParams {
                interior_walls: cfg.level.interior_walls,
                hide_spots: cfg.level.hide_spots,
            },
            guard: cfg.guard_tuning(),
            player: cfg.player_tuning(),
            standing_guards: cfg.guard.standing_count,
            moving_guards: cfg.guard.moving_count,
            tick_rate_ms: cfg.speed.tick_rate_ms,
            lure_radius: cfg.bomb.lure_radius,
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        WorldSettings::from_config(&GameConfig::default())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GuardSpawn {
    pub kind: GuardKind,
    pub cell: Cell,
}

pub struct WorldState {
    // ── Tiles ──
    pub map: TileMap,
    base: TileSnapshot,

    // ── Actors ──
    pub player: Player,
    pub guards: Vec<Guard>,
    pub distractions: Vec<DistractionEffect>,

    // ── Spawn records ──
    pub player_spawn: Cell,
    pub guard_spawns: Vec<GuardSpawn>,

    // ── Meta ──
    pub settings: WorldSettings,
    pub phase: Phase,
    pub paused: bool,
    pub level: u32,
    pub now_ms: u64,
    pub tick: u64,
    pub spotted_by: Option<usize>,
}

// ── Construction ──

impl WorldState {
    /// Generate the first level.
    pub fn new<R: Rng + ?Sized>(settings: WorldSettings, rng: &mut R) -> Self {
        let map = generator::generate(settings.variant, settings.generator, rng);
        let mut world = WorldState::with_map(settings, map, rng);
        world.level = 1;
        world
    }

    /// Populate an existing map: sample spawns, create actors.
    pub fn with_map<R: Rng + ?Sized>(settings: WorldSettings, map: TileMap, rng: &mut R) -> Self {
        let guard_spawns = sample_guard_spawns(&map, &settings, rng);
        let occupied: Vec<Cell> = guard_spawns.iter().map(|s| s.cell).collect();
        let player_spawn = map.valid_player_spawn(&occupied, rng);
        info!(
            "level ready: {} guards, player at {:?}, exit at {:?}",
            guard_spawns.len(), player_spawn, map.exit(),
        );

        WorldState {
            base: map.snapshot(),
            player: Player::new(player_spawn, settings.player),
            guards: spawn_guards(&guard_spawns, settings.guard),
            distractions: Vec::new(),
            map,
            player_spawn,
            guard_spawns,
            settings,
            phase: Phase::Playing,
            paused: false,
            level: 0,
            now_ms: 0,
            tick: 0,
            spotted_by: None,
        }
    }
}

fn sample_guard_spawns<R: Rng + ?Sized>(map: &TileMap, settings: &WorldSettings, rng: &mut R) -> Vec<GuardSpawn> {
    let standing = std::iter::repeat(GuardKind::Standing).take(settings.standing_guards);
    let moving = std::iter::repeat(GuardKind::Moving).take(settings.moving_guards);
    standing
        .chain(moving)
        .map(|kind| GuardSpawn { kind, cell: map.random_floor_position(rng) })
        .collect()
}

fn spawn_guards(spawns: &[GuardSpawn], tuning: GuardTuning) -> Vec<Guard> {
    spawns
        .iter()
        .enumerate()
        .map(|(id, s)| Guard::new(id, s.kind, s.cell, tuning))
        .collect()
}

// ── Level lifecycle ──

impl WorldState {
    /// Restart the current level from its spawn records.
    pub fn reset_level(&mut self) {
        self.map.restore(&self.base);
        self.player = Player::new(self.player_spawn, self.settings.player);
        self.guards = spawn_guards(&self.guard_spawns, self.settings.guard);
        self.distractions.clear();
        self.phase = Phase::Playing;
        self.paused = false;
        self.spotted_by = None;
        info!("level {} reset", self.level);
    }

    /// Generate a fresh level and bump the counter. The clock keeps running.
    pub fn next_level<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let map = generator::generate(self.settings.variant, self.settings.generator, rng);
        let clock = (self.now_ms, self.tick);
        let level = self.level + 1;
        *self = WorldState::with_map(self.settings, map, rng);
        (self.now_ms, self.tick) = clock;
        self.level = level;
        info!("entered level {level}");
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing && !self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geom::Point;
    use crate::domain::tile::TileKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn world(seed: u64) -> (WorldState, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let w = WorldState::new(WorldSettings::default(), &mut rng);
        (w, rng)
    }

    #[test]
    fn new_world_spawns_configured_guards() {
        let (w, _) = world(3);
        assert_eq!(w.level, 1);
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.guards.len(), 2);
        assert_eq!(w.guards[0].kind(), GuardKind::Standing);
        assert_eq!(w.guards[1].kind(), GuardKind::Moving);
        assert!(w.map.is_walkable_cell(w.player_spawn));
    }

    #[test]
    fn reset_restores_tiles_and_actors() {
        let (mut w, _) = world(5);
        let untouched = w.map.snapshot();
        w.map.set_tile(3, 3, TileKind::Wall);
        w.player.respawn_at(Cell::new(1, 1));
        let g0 = w.guards[0].center();
        w.guards[0].distract(&w.map, Point::new(100.0, 100.0));
        w.distractions.push(DistractionEffect::new(Point::new(0.0, 0.0), 0));
        w.phase = Phase::Spotted;

        w.reset_level();
        assert_eq!(w.map.snapshot(), untouched);
        assert_eq!(w.player.cell(), w.player_spawn);
        assert_eq!(w.guards[0].kind(), GuardKind::Standing);
        assert_eq!(w.guards[0].center(), g0);
        assert!(w.distractions.is_empty());
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn next_level_counts_up_and_keeps_clock() {
        let (mut w, mut rng) = world(9);
        w.now_ms = 12_345;
        w.phase = Phase::Escaped;
        w.next_level(&mut rng);
        assert_eq!(w.level, 2);
        assert_eq!(w.now_ms, 12_345);
        assert_eq!(w.phase, Phase::Playing);
    }

    #[test]
    fn player_spawn_clear_of_exit_when_possible() {
        for seed in 0..10 {
            let (w, _) = world(seed);
            let occupied: Vec<Cell> = w.guard_spawns.iter().map(|s| s.cell).collect();
            let (wi, hi) = (w.map.width() as i32, w.map.height() as i32);
            let any_valid = (2..wi - 2)
                .flat_map(|x| (2..hi - 2).map(move |y| Cell::new(x, y)))
                .any(|c| w.map.is_valid_spawn(c, &occupied));
            if any_valid {
                assert!(w.map.is_valid_spawn(w.player_spawn, &occupied), "seed {seed}");
            }
        }
    }
}
