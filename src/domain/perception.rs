/// Guard perception: can a guard see the player this tick?
///
/// Pure functions over a guard, the player's read contract, the active
/// distractions and the map. Evaluation short-circuits in this order:
///
///   1. no player / player hidden            → NoTarget / Hidden
///   2. active distraction covering the guard → Suppressed
///        Standing: always.
///        Moving:   when the player is beyond half the vision radius.
///   3. beyond vision radius (× gear multiplier) → OutOfRange
///   4. angular factor ≤ 0                    → OutsideCone
///   5. stepped segment sample hits non-walkable → Blocked
///   6. otherwise                             → Seen

use super::distraction::DistractionEffect;
use super::geom::{normalize_angle, Point};
use super::guard::{Guard, GuardKind};
use super::map::TileMap;

/// Total field of view, degrees.
pub const FIELD_OF_VIEW: f64 = 90.0;
/// Inner cone of full-confidence detection, degrees.
pub const DIRECT_VIEW_ANGLE: f64 = 30.0;
/// Moving guards inside a distraction only see this fraction of their radius.
pub const DISTRACTED_VISION_FACTOR: f64 = 0.5;
/// Spacing of line-of-sight samples, world units.
const LOS_SAMPLE_STEP: f64 = 4.0;

/// What perception needs to know about the player.
pub trait Observable {
    /// World-space centre.
    fn center(&self) -> Point;
    fn is_hidden(&self) -> bool;
    fn is_stealth_class(&self) -> bool;
    /// Scales guard vision radius against this target. Below 1.0 for stealth gear.
    fn vision_multiplier(&self) -> f64;
}

/// Outcome of a perception check, with the reason when not seen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Detection {
    NoTarget,
    Hidden,
    Suppressed,
    OutOfRange,
    OutsideCone,
    Blocked,
    Seen,
}

impl Detection {
    pub fn is_seen(self) -> bool {
        self == Detection::Seen
    }
}

/// Boolean form of `assess`.
pub fn can_see<P: Observable + ?Sized>(
    guard: &Guard,
    player: Option<&P>,
    distractions: &[DistractionEffect],
    map: &TileMap,
    now_ms: u64,
) -> bool {
    assess(guard, player, distractions, map, now_ms).is_seen()
}

/// Full perception check. See module docs for the order.
pub fn assess<P: Observable + ?Sized>(
    guard: &Guard,
    player: Option<&P>,
    distractions: &[DistractionEffect],
    map: &TileMap,
    now_ms: u64,
) -> Detection {
    let player = match player {
        Some(p) => p,
        None => return Detection::NoTarget,
    };
    if player.is_hidden() { return Detection::Hidden; }

    let eye = guard.center();
    let target = player.center();
    let dist_sq = eye.distance_sq(target);

    for effect in distractions {
        if !effect.affects(eye, now_ms) { continue; }
        match guard.kind() {
            GuardKind::Standing => return Detection::Suppressed,
            GuardKind::Moving => {
                let reduced = guard.vision_radius() * DISTRACTED_VISION_FACTOR;
                if dist_sq > reduced * reduced { return Detection::Suppressed; }
            }
        }
    }

    let radius = guard.vision_radius() * player.vision_multiplier();
    if dist_sq > radius * radius { return Detection::OutOfRange; }

    if angle_factor(guard.facing_deg(), eye, target) <= 0.0 { return Detection::OutsideCone; }

    if !segment_clear(map, eye, target, dist_sq.sqrt()) { return Detection::Blocked; }

    Detection::Seen
}

/// Angular detection factor for a guard looking at `target`.
///
/// 1.0 inside the direct cone, 0.0 outside the field of view, linear between.
pub fn detection_angle_factor(guard: &Guard, target: Point) -> f64 {
    angle_factor(guard.facing_deg(), guard.center(), target)
}

/// Absolute angle in degrees between `facing` and the bearing `from → to`.
pub fn angle_off_facing(facing: f64, from: Point, to: Point) -> f64 {
    normalize_angle(from.bearing_to(to) - facing).abs()
}

fn angle_factor(facing: f64, from: Point, to: Point) -> f64 {
    factor_for_angle(angle_off_facing(facing, from, to))
}

/// The factor as a function of the absolute off-axis angle alone.
pub fn factor_for_angle(angle_diff: f64) -> f64 {
    let half_fov = FIELD_OF_VIEW / 2.0;
    let half_direct = DIRECT_VIEW_ANGLE / 2.0;
    if angle_diff > half_fov {
        0.0
    } else if angle_diff <= half_direct {
        1.0
    } else {
        1.0 - (angle_diff - half_direct) / (half_fov - half_direct)
    }
}

/// Walk the segment in ~4-unit steps, requiring every sampled cell to be walkable.
fn segment_clear(map: &TileMap, from: Point, to: Point, dist: f64) -> bool {
    let steps = ((dist / LOS_SAMPLE_STEP) as u32).max(1);
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    (1..=steps).all(|i| {
        let t = i as f64 / steps as f64;
        let c = Point::new(from.x + dx * t, from.y + dy * t).cell();
        map.is_walkable_cell(c)
    })
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
