/// Guard agents and their behaviour state machine.
///
/// A guard is either **Standing** (posted, never moves) or **Moving**
/// (patrols between random floor cells). The two are distinct variants of
/// `Posture`; a distraction replaces a Standing posture with a Moving one
/// carrying the guard's position over. There is no way back.
///
/// Moving guards cycle through:
///   Idle ──repath──▶ Patrolling (paused until `idle_until_ms`) ──walk──▶ Idle
///
/// Distracted is Patrolling toward a distraction origin; when that path is
/// exhausted the guard drops back into the normal Idle → repath cycle.

use log::{debug, warn};
use rand::Rng;

use super::geom::{Cell, Point};
use super::map::TileMap;
use super::pathfinding::find_path;

/// Guards occupy a full tile.
pub const GUARD_SIZE: f64 = 32.0;

/// How a Standing guard picks its facing each tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FacingPolicy {
    /// `clock_ms mod 360` degrees. Effectively a 360°/0.36 s spin.
    ClockModulo,
    /// Steady rotation at a fixed angular speed.
    Sweep { degrees_per_sec: f64 },
}

impl FacingPolicy {
    pub fn facing_at(self, now_ms: u64) -> f64 {
        match self {
            FacingPolicy::ClockModulo => (now_ms % 360) as f64,
            FacingPolicy::Sweep { degrees_per_sec } => {
                (now_ms as f64 / 1000.0 * degrees_per_sec).rem_euclid(360.0)
            }
        }
    }
}

/// Per-guard constants (filled from `[guard]` / `[speed]` config).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GuardTuning {
    pub standing_vision: f64,
    pub moving_vision: f64,
    pub speed: f64,
    pub repath_attempts: u32,
    pub idle_min_ms: u64,
    pub idle_max_ms: u64,
    pub waypoint_epsilon: f64,
    pub standing_facing: FacingPolicy,
}

impl Default for GuardTuning {
    fn default() -> Self {
        GuardTuning {
            standing_vision: 100.0,
            moving_vision: 60.0,
            speed: 1.5,
            repath_attempts: 50,
            idle_min_ms: 1000,
            idle_max_ms: 3000,
            waypoint_epsilon: 2.0,
            standing_facing: FacingPolicy::ClockModulo,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GuardKind {
    Standing,
    Moving,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GuardState {
    Idle,
    Patrolling,
    Distracted,
}

/// Standing guard: stationary, only the facing changes.
#[derive(Clone, Debug, PartialEq)]
pub struct Sentry {
    facing_deg: f64,
}

/// Moving guard: a waypoint path and the pause before the next walk.
#[derive(Clone, Debug, PartialEq)]
pub struct Patrol {
    path: Vec<Cell>,
    cursor: usize,
    idle_until_ms: u64,
    distracted: bool,
    facing_deg: f64,
}

impl Patrol {
    fn new() -> Self {
        Patrol { path: Vec::new(), cursor: 0, idle_until_ms: 0, distracted: false, facing_deg: 0.0 }
    }

    fn has_target(&self) -> bool {
        self.cursor < self.path.len()
    }

    fn target(&self) -> Option<Cell> {
        self.path.get(self.cursor).copied()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Posture {
    Standing(Sentry),
    Moving(Patrol),
}

#[derive(Clone, Debug)]
pub struct Guard {
    pub id: usize,
    center: Point,
    posture: Posture,
    tuning: GuardTuning,
}

// ── Construction ──

impl Guard {
    pub fn standing(id: usize, cell: Cell, tuning: GuardTuning) -> Self {
        Guard {
            id,
            center: cell.center(),
            posture: Posture::Standing(Sentry { facing_deg: 0.0 }),
            tuning,
        }
    }

    pub fn moving(id: usize, cell: Cell, tuning: GuardTuning) -> Self {
        Guard {
            id,
            center: cell.center(),
            posture: Posture::Moving(Patrol::new()),
            tuning,
        }
    }

    pub fn new(id: usize, kind: GuardKind, cell: Cell, tuning: GuardTuning) -> Self {
        match kind {
            GuardKind::Standing => Guard::standing(id, cell, tuning),
            GuardKind::Moving => Guard::moving(id, cell, tuning),
        }
    }
}

// ── Geometry / state accessors (presentation + perception) ──

impl Guard {
    pub fn kind(&self) -> GuardKind {
        match self.posture {
            Posture::Standing(_) => GuardKind::Standing,
            Posture::Moving(_) => GuardKind::Moving,
        }
    }

    pub fn state(&self) -> GuardState {
        match &self.posture {
            Posture::Standing(_) => GuardState::Idle,
            Posture::Moving(p) if !p.has_target() => GuardState::Idle,
            Posture::Moving(p) if p.distracted => GuardState::Distracted,
            Posture::Moving(_) => GuardState::Patrolling,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn cell(&self) -> Cell {
        self.center.cell()
    }

    pub fn vision_radius(&self) -> f64 {
        match self.kind() {
            GuardKind::Standing => self.tuning.standing_vision,
            GuardKind::Moving => self.tuning.moving_vision,
        }
    }

    /// Facing in degrees (atan2 convention, 0° = east).
    pub fn facing_deg(&self) -> f64 {
        match &self.posture {
            Posture::Standing(s) => s.facing_deg,
            Posture::Moving(p) => p.facing_deg,
        }
    }

    pub fn path(&self) -> &[Cell] {
        match &self.posture {
            Posture::Standing(_) => &[],
            Posture::Moving(p) => &p.path,
        }
    }

    pub fn path_cursor(&self) -> usize {
        match &self.posture {
            Posture::Standing(_) => 0,
            Posture::Moving(p) => p.cursor,
        }
    }

    pub fn idle_until_ms(&self) -> u64 {
        match &self.posture {
            Posture::Standing(_) => 0,
            Posture::Moving(p) => p.idle_until_ms,
        }
    }

    pub fn is_distracted(&self) -> bool {
        matches!(&self.posture, Posture::Moving(p) if p.distracted)
    }

    pub fn posture(&self) -> &Posture {
        &self.posture
    }
}

// ── Behaviour ──

impl Guard {
    /// Advance one tick.
    pub fn update<R: Rng + ?Sized>(&mut self, map: &TileMap, now_ms: u64, rng: &mut R) {
        let tuning = self.tuning;
        let id = self.id;
        let here = self.cell();
        let mut center = self.center;

        match &mut self.posture {
            Posture::Standing(s) => {
                s.facing_deg = tuning.standing_facing.facing_at(now_ms);
            }
            Posture::Moving(p) => {
                if now_ms < p.idle_until_ms {
                    refresh_facing(p, center, tuning.waypoint_epsilon);
                    return;
                }

                if !p.has_target() {
                    p.distracted = false;
                    repath(p, id, map, here, &tuning, rng);
                    let pause = rng.gen_range(tuning.idle_min_ms..tuning.idle_max_ms);
                    p.idle_until_ms = now_ms + pause;
                    refresh_facing(p, center, tuning.waypoint_epsilon);
                    return;
                }

                if let Some(target_cell) = p.target() {
                    let target = target_cell.center();
                    let dx = target.x - center.x;
                    let dy = target.y - center.y;
                    let dist = (dx * dx + dy * dy).sqrt();

                    if dist < tuning.waypoint_epsilon {
                        // Settle on the waypoint so the box realigns with the grid.
                        if can_occupy(map, target) {
                            center = target;
                        }
                        p.cursor += 1;
                    } else {
                        p.facing_deg = dy.atan2(dx).to_degrees();
                        let step = tuning.speed.min(dist);
                        let nx = center.x + step * dx / dist;
                        let ny = center.y + step * dy / dist;
                        if can_occupy(map, Point::new(nx, center.y)) {
                            center.x = nx;
                        }
                        if can_occupy(map, Point::new(center.x, ny)) {
                            center.y = ny;
                        }
                    }
                }
                refresh_facing(p, center, tuning.waypoint_epsilon);
            }
        }

        self.center = center;
    }

    /// External trigger: send a Standing guard to investigate `target`.
    ///
    /// The guard becomes Moving for good, with a path toward the target
    /// cell. With no route it is left Moving with an empty path and falls
    /// into the normal repath cycle. Returns `false` for guards that were
    /// already Moving.
    pub fn distract(&mut self, map: &TileMap, target: Point) -> bool {
        let facing = match &self.posture {
            Posture::Standing(s) => s.facing_deg,
            Posture::Moving(_) => return false,
        };
        let path = find_path(map, self.cell(), target.cell());
        debug!("guard {} distracted toward {:?} ({} steps)", self.id, target.cell(), path.len());
        self.posture = Posture::Moving(Patrol {
            distracted: !path.is_empty(),
            path,
            cursor: 0,
            idle_until_ms: 0,
            facing_deg: facing,
        });
        true
    }
}

/// Try up to `repath_attempts` random destinations. Leaves the path empty on failure.
fn repath<R: Rng + ?Sized>(
    p: &mut Patrol,
    id: usize,
    map: &TileMap,
    from: Cell,
    tuning: &GuardTuning,
    rng: &mut R,
) -> bool {
    for attempt in 0..tuning.repath_attempts {
        let dest = map.random_floor_position(rng);
        let path = find_path(map, from, dest);
        if !path.is_empty() {
            debug!("guard {id} repath to {dest:?}: {} steps (attempt {})", path.len(), attempt + 1);
            p.path = path;
            p.cursor = 0;
            return true;
        }
    }
    warn!("guard {id} found no patrol route from {from:?} after {} attempts", tuning.repath_attempts);
    p.path.clear();
    p.cursor = 0;
    false
}

/// Face the current waypoint, keeping the old heading when already on it.
fn refresh_facing(p: &mut Patrol, center: Point, epsilon: f64) {
    if let Some(t) = p.target() {
        let t = t.center();
        if center.distance_sq(t) >= epsilon * epsilon {
            p.facing_deg = center.bearing_to(t);
        }
    }
}

/// Would a guard box centred at `center` rest entirely on walkable tiles?
fn can_occupy(map: &TileMap, center: Point) -> bool {
    map.box_fits(center, GUARD_SIZE)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
