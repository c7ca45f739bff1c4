/// Procedural level generation.
///
/// ## Open arena
///   Floor field with a Wall border, a few random interior wall segments,
///   an exit cut into a random border side, and hide spots scattered on
///   floor away from the exit.
///
/// ## Platformer
///   A Gap field with rising platforms left to right. Each gap between two
///   platforms is spanned by a one-tile catwalk on the second-to-last row,
///   so the exit at the far right stays reachable on foot. Stepping off a
///   platform or catwalk is a fall.

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::geom::Cell;
use crate::domain::map::TileMap;
use crate::domain::tile::{LevelVariant, TileKind};

pub const LEVEL_WIDTH: usize = 25;
pub const LEVEL_HEIGHT: usize = 18;

const WALL_LEN_MIN: i32 = 3;
const WALL_LEN_MAX: i32 = 6;
const HIDE_MARGIN: i32 = 2;

const PLATFORM_WIDTH: std::ops::Range<i32> = 3..8;
const PLATFORM_HEIGHT: std::ops::Range<i32> = 2..5;
const GAP_WIDTH: std::ops::Range<i32> = 2..5;
const GRAPPLE_CHANCE: f64 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorParams {
    pub interior_walls: u32,
    pub hide_spots: u32,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        GeneratorParams { interior_walls: 5, hide_spots: 8 }
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn generate<R: Rng + ?Sized>(variant: LevelVariant, params: GeneratorParams, rng: &mut R) -> TileMap {
    let map = match variant {
        LevelVariant::OpenArena => generate_arena(LEVEL_WIDTH, LEVEL_HEIGHT, params, rng),
        LevelVariant::Platformer => generate_platformer(LEVEL_WIDTH, LEVEL_HEIGHT, rng),
    };
    info!("generated {:?} level {}x{}, exit at {:?}", variant, map.width(), map.height(), map.exit());
    map
}

// ══════════════════════════════════════════════════════════════
// Open arena
// ══════════════════════════════════════════════════════════════

pub fn generate_arena<R: Rng + ?Sized>(w: usize, h: usize, params: GeneratorParams, rng: &mut R) -> TileMap {
    let mut map = TileMap::filled(w, h, TileKind::Floor, LevelVariant::OpenArena);
    let (wi, hi) = (w as i32, h as i32);

    // ── Border ──
    for x in 0..wi {
        map.set_tile(x, 0, TileKind::Wall);
        map.set_tile(x, hi - 1, TileKind::Wall);
    }
    for y in 0..hi {
        map.set_tile(0, y, TileKind::Wall);
        map.set_tile(wi - 1, y, TileKind::Wall);
    }

    // ── Interior segments ──
    if wi > 6 && hi > 6 {
        for _ in 0..params.interior_walls {
            let ox = rng.gen_range(3..wi - 3);
            let oy = rng.gen_range(3..hi - 3);
            let len = rng.gen_range(WALL_LEN_MIN..=WALL_LEN_MAX);
            let horizontal = rng.gen_bool(0.5);
            for i in 0..len {
                let (x, y) = if horizontal { (ox + i, oy) } else { (ox, oy + i) };
                if x >= wi - 1 || y >= hi - 1 { break; }
                map.set_tile(x, y, TileKind::Wall);
            }
        }
    }

    // ── Exit (before hide spots, so the exclusion box applies) ──
    let (exit, inner) = match rng.gen_range(0..4) {
        0 => { let x = rng.gen_range(1..wi - 1); (Cell::new(x, 0), Cell::new(x, 1)) }
        1 => { let y = rng.gen_range(1..hi - 1); (Cell::new(wi - 1, y), Cell::new(wi - 2, y)) }
        2 => { let x = rng.gen_range(1..wi - 1); (Cell::new(x, hi - 1), Cell::new(x, hi - 2)) }
        _ => { let y = rng.gen_range(1..hi - 1); (Cell::new(0, y), Cell::new(1, y)) }
    };
    map.set_exit(exit);
    map.set_tile(inner.x, inner.y, TileKind::Floor);

    // ── Hide spots ──
    let mut spots: Vec<Cell> = (HIDE_MARGIN..wi - HIDE_MARGIN)
        .flat_map(|x| (HIDE_MARGIN..hi - HIDE_MARGIN).map(move |y| Cell::new(x, y)))
        .filter(|&c| map.tile(c.x, c.y) == TileKind::Floor && !map.is_near_exit(c))
        .collect();
    spots.shuffle(rng);
    for c in spots.into_iter().take(params.hide_spots as usize) {
        map.set_tile(c.x, c.y, TileKind::HideSpot);
    }

    map
}

// ══════════════════════════════════════════════════════════════
// Platformer
// ══════════════════════════════════════════════════════════════

pub fn generate_platformer<R: Rng + ?Sized>(w: usize, h: usize, rng: &mut R) -> TileMap {
    let mut map = TileMap::filled(w, h, TileKind::Gap, LevelVariant::Platformer);
    let (wi, hi) = (w as i32, h as i32);
    let walk_row = hi - 2;

    let mut x = 1;
    let mut prev_end: Option<i32> = None;
    while x < wi - 1 {
        let mut width = rng.gen_range(PLATFORM_WIDTH);
        if x + width >= wi - 1 {
            width = wi - x - 2;
        }
        if width < 1 { break; }
        let height = rng.gen_range(PLATFORM_HEIGHT);
        let top = hi - height - 1;

        for px in x..x + width {
            for py in top..hi - 1 {
                map.set_tile(px, py, TileKind::Platform);
            }
        }

        if rng.gen_bool(GRAPPLE_CHANCE) {
            let gx = x + rng.gen_range(0..width);
            map.set_tile(gx, top - 1, TileKind::GrapplePoint);
        }

        if let Some(end) = prev_end {
            for cx in end..x {
                map.set_tile(cx, walk_row, TileKind::Platform);
            }
        }
        prev_end = Some(x + width);

        x += width + rng.gen_range(GAP_WIDTH);
    }

    // Run the catwalk out to the exit column.
    if let Some(end) = prev_end {
        for cx in end..wi - 2 {
            map.set_tile(cx, walk_row, TileKind::Platform);
        }
    }
    map.set_exit(Cell::new(wi - 2, walk_row));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pathfinding::find_path;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arena(seed: u64) -> TileMap {
        generate(LevelVariant::OpenArena, GeneratorParams::default(), &mut StdRng::seed_from_u64(seed))
    }

    fn count(map: &TileMap, kind: TileKind) -> usize {
        map.rows().flatten().filter(|&&k| k == kind).count()
    }

    #[test]
    fn arena_has_border_and_one_exit() {
        for seed in 0..20 {
            let map = arena(seed);
            assert_eq!((map.width(), map.height()), (LEVEL_WIDTH, LEVEL_HEIGHT));
            assert_eq!(count(&map, TileKind::Exit), 1);
            let e = map.exit();
            let on_border = e.x == 0 || e.y == 0
                || e.x == LEVEL_WIDTH as i32 - 1 || e.y == LEVEL_HEIGHT as i32 - 1;
            assert!(on_border, "seed {seed}: exit {e:?} not on border");
            for x in 0..LEVEL_WIDTH as i32 {
                for y in [0, LEVEL_HEIGHT as i32 - 1] {
                    let k = map.tile(x, y);
                    assert!(k == TileKind::Wall || k == TileKind::Exit);
                }
            }
        }
    }

    #[test]
    fn arena_exit_opens_inward() {
        for seed in 0..20 {
            let map = arena(seed);
            let e = map.exit();
            let inward = [(0, 1), (0, -1), (1, 0), (-1, 0)]
                .iter()
                .map(|(dx, dy)| Cell::new(e.x + dx, e.y + dy))
                .filter(|c| map.in_bounds(c.x, c.y))
                .any(|c| map.tile(c.x, c.y) == TileKind::Floor);
            assert!(inward, "seed {seed}");
        }
    }

    #[test]
    fn arena_hide_spots_avoid_exit_and_border() {
        for seed in 0..20 {
            let map = arena(seed);
            assert!(count(&map, TileKind::HideSpot) <= 8);
            for (y, row) in map.rows().enumerate() {
                for (x, &k) in row.iter().enumerate() {
                    if k != TileKind::HideSpot { continue; }
                    let c = Cell::new(x as i32, y as i32);
                    assert!(!map.is_near_exit(c), "seed {seed}: {c:?}");
                    assert!(c.x >= 2 && c.y >= 2);
                    assert!(c.x < LEVEL_WIDTH as i32 - 2 && c.y < LEVEL_HEIGHT as i32 - 2);
                }
            }
        }
    }

    #[test]
    fn same_seed_same_level() {
        let a = arena(42);
        let b = arena(42);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn platformer_exit_is_reachable_on_foot() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let map = generate(LevelVariant::Platformer, GeneratorParams::default(), &mut rng);
            assert_eq!(map.exit(), Cell::new(LEVEL_WIDTH as i32 - 2, LEVEL_HEIGHT as i32 - 2));
            assert_eq!(count(&map, TileKind::HideSpot), 0);
            // Bottom row stays open.
            for x in 0..LEVEL_WIDTH as i32 {
                assert_eq!(map.tile(x, LEVEL_HEIGHT as i32 - 1), TileKind::Gap);
            }
            let start = Cell::new(1, LEVEL_HEIGHT as i32 - 2);
            assert!(map.is_walkable_cell(start), "seed {seed}");
            assert!(!find_path(&map, start, map.exit()).is_empty(), "seed {seed}");
        }
    }
}
