/// TileMap: the level grid and every spatial query the guards need.
///
/// ## Conventions
///   - `tiles[y][x]`, row-major, `width × height`.
///   - Any query outside `[0,width) × [0,height)` reads as `Wall`.
///   - Walkability / hideability are routed through the map's `LevelVariant`.
///   - Tiles are only mutated by generation and by snapshot restore.

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use super::geom::{Cell, Point, TILE_SIZE};
use super::tile::{LevelVariant, TileKind};

/// Sampled positions keep this many tiles away from the map edge.
const BORDER_MARGIN: i32 = 2;
/// Sampled floor positions stay outside this box around the exit.
const EXIT_EXCLUSION: i32 = 2;
/// Player spawn stays outside this box around the exit.
const SPAWN_EXIT_CLEARANCE: i32 = 5;
/// Player spawn stays outside this box around every occupied cell.
const SPAWN_OCCUPIED_CLEARANCE: i32 = 3;

/// Generation-time copy of the tiles, restored on level reset.
#[derive(Clone, Debug, PartialEq)]
pub struct TileSnapshot {
    tiles: Vec<Vec<TileKind>>,
    exit: Cell,
}

#[derive(Clone, Debug)]
pub struct TileMap {
    width: usize,
    height: usize,
    tiles: Vec<Vec<TileKind>>,
    variant: LevelVariant,
    exit: Cell,
}

// ── Construction ──

impl TileMap {
    /// A `width × height` map of `fill` with the exit at (0, 0) until placed.
    pub fn filled(width: usize, height: usize, fill: TileKind, variant: LevelVariant) -> Self {
        TileMap {
            width,
            height,
            tiles: vec![vec![fill; width]; height],
            variant,
            exit: Cell::new(0, 0),
        }
    }

    /// Build from a text diagram (one string per row, see `TileKind::from_glyph`).
    /// The first `E` found becomes the exit.
    pub fn from_rows(rows: &[&str], variant: LevelVariant) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut map = TileMap::filled(width, height, TileKind::Wall, variant);
        let mut exit = None;
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let kind = TileKind::from_glyph(ch);
                if kind == TileKind::Exit && exit.is_none() {
                    exit = Some(Cell::new(x as i32, y as i32));
                }
                map.tiles[y][x] = kind;
            }
        }
        if let Some(e) = exit {
            map.exit = e;
        }
        map
    }
}

// ── Tile access ──

impl TileMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn variant(&self) -> LevelVariant {
        self.variant
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Tile at (x, y). Out of bounds = Wall.
    #[inline]
    pub fn tile(&self, x: i32, y: i32) -> TileKind {
        if !self.in_bounds(x, y) {
            return TileKind::Wall;
        }
        self.tiles[y as usize][x as usize]
    }

    /// Overwrite a tile. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set_tile(&mut self, x: i32, y: i32, kind: TileKind) {
        if self.in_bounds(x, y) {
            self.tiles[y as usize][x as usize] = kind;
        }
    }

    #[inline]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.variant.is_walkable(self.tile(x, y))
    }

    #[inline]
    pub fn is_hideable(&self, x: i32, y: i32) -> bool {
        self.variant.is_hideable(self.tile(x, y))
    }

    #[inline]
    pub fn is_fall_through(&self, x: i32, y: i32) -> bool {
        self.variant.is_fall_through(self.tile(x, y))
    }

    #[inline]
    pub fn is_walkable_cell(&self, c: Cell) -> bool {
        self.is_walkable(c.x, c.y)
    }

    pub fn exit(&self) -> Cell {
        self.exit
    }

    /// Mark `cell` as the exit (writes the tile too).
    pub fn set_exit(&mut self, cell: Cell) {
        self.set_tile(cell.x, cell.y, TileKind::Exit);
        self.exit = cell;
    }

    pub fn is_at_exit(&self, cell: Cell) -> bool {
        cell == self.exit
    }

    /// Map centre, the fallback for every sampler.
    pub fn center_cell(&self) -> Cell {
        Cell::new(self.width as i32 / 2, self.height as i32 / 2)
    }

    /// Would a `size × size` box centred at `center` rest on walkable tiles?
    ///
    /// Checks the four corner cells (inclusive far edge at `+size-1`) and
    /// rejects boxes that leave the map.
    pub fn box_fits(&self, center: Point, size: f64) -> bool {
        self.box_corners_all(center, size, |x, y| self.is_walkable(x, y))
    }

    /// Like `box_fits`, but fall-through tiles count as enterable.
    pub fn box_passable(&self, center: Point, size: f64) -> bool {
        self.box_corners_all(center, size, |x, y| self.is_walkable(x, y) || self.is_fall_through(x, y))
    }

    fn box_corners_all<F: Fn(i32, i32) -> bool>(&self, center: Point, size: f64, ok: F) -> bool {
        let left = center.x - size / 2.0;
        let top = center.y - size / 2.0;
        let max_x = self.width as f64 * TILE_SIZE;
        let max_y = self.height as f64 * TILE_SIZE;
        if left < 0.0 || top < 0.0 || left + size > max_x || top + size > max_y {
            return false;
        }

        let xs = [(left / TILE_SIZE) as i32, ((left + size - 1.0) / TILE_SIZE) as i32];
        let ys = [(top / TILE_SIZE) as i32, ((top + size - 1.0) / TILE_SIZE) as i32];
        xs.iter().all(|&cx| ys.iter().all(|&cy| ok(cx, cy)))
    }

    /// Row slice for rendering.
    pub fn rows(&self) -> impl Iterator<Item = &[TileKind]> {
        self.tiles.iter().map(|r| r.as_slice())
    }
}

// ── Snapshot / restore (level reset only) ──

impl TileMap {
    pub fn snapshot(&self) -> TileSnapshot {
        TileSnapshot { tiles: self.tiles.clone(), exit: self.exit }
    }

    /// Copy a snapshot back in. A snapshot of a different size is ignored.
    pub fn restore(&mut self, snap: &TileSnapshot) {
        if snap.tiles.len() != self.height || snap.tiles.first().map_or(0, |r| r.len()) != self.width {
            warn!("tile snapshot size mismatch; restore skipped");
            return;
        }
        self.tiles.clone_from(&snap.tiles);
        self.exit = snap.exit;
    }
}

// ── Line of sight ──

impl TileMap {
    /// Bresenham raycast between two cells.
    ///
    /// Walks from the start cell toward the target, returning `false` as soon
    /// as a visited cell is a Wall and `true` once the target is reached.
    /// The target cell itself is never tested; the start cell is.
    pub fn has_line_of_sight(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x1, y1);

        loop {
            if x == x2 && y == y2 { return true; }
            if self.tile(x, y) == TileKind::Wall { return false; }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}

// ── Constrained sampling ──

impl TileMap {
    /// Cells inside the border margin, in x-major order.
    fn interior_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let w = self.width as i32;
        let h = self.height as i32;
        (BORDER_MARGIN..w - BORDER_MARGIN)
            .flat_map(move |x| (BORDER_MARGIN..h - BORDER_MARGIN).map(move |y| Cell::new(x, y)))
    }

    /// Is `cell` inside the no-spawn box around the exit?
    pub fn is_near_exit(&self, cell: Cell) -> bool {
        cell.within_box(self.exit, EXIT_EXCLUSION)
    }

    /// Every cell `random_floor_position` may return.
    pub fn floor_candidates(&self) -> Vec<Cell> {
        self.interior_cells()
            .filter(|&c| self.is_walkable_cell(c) && !self.is_near_exit(c))
            .collect()
    }

    /// Uniform pick among walkable interior cells away from the exit.
    /// Falls back to the map centre when nothing qualifies.
    pub fn random_floor_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Cell {
        let candidates = self.floor_candidates();
        match candidates.choose(rng) {
            Some(&c) => c,
            None => {
                warn!("no floor candidates; falling back to map centre");
                self.center_cell()
            }
        }
    }

    /// Could the player start at `cell` given the occupied cells?
    ///
    /// Rejected when inside the exit clearance box or inside the clearance
    /// box of any occupied cell. Each box is tested per axis.
    pub fn is_valid_spawn(&self, cell: Cell, occupied: &[Cell]) -> bool {
        if !self.is_walkable_cell(cell) { return false; }
        if cell.within_box(self.exit, SPAWN_EXIT_CLEARANCE) { return false; }
        !occupied.iter().any(|&o| cell.within_box(o, SPAWN_OCCUPIED_CLEARANCE))
    }

    /// Uniform pick among valid player spawns, else `random_floor_position`.
    pub fn valid_player_spawn<R: Rng + ?Sized>(&self, occupied: &[Cell], rng: &mut R) -> Cell {
        let candidates: Vec<Cell> = self
            .interior_cells()
            .filter(|&c| self.is_valid_spawn(c, occupied))
            .collect();
        match candidates.choose(rng) {
            Some(&c) => c,
            None => {
                warn!("no clear player spawn; using any floor cell");
                self.random_floor_position(rng)
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arena(rows: &[&str]) -> TileMap {
        TileMap::from_rows(rows, LevelVariant::OpenArena)
    }

    fn open_room(w: usize, h: usize) -> TileMap {
        let mut map = TileMap::filled(w, h, TileKind::Floor, LevelVariant::OpenArena);
        for x in 0..w as i32 {
            map.set_tile(x, 0, TileKind::Wall);
            map.set_tile(x, h as i32 - 1, TileKind::Wall);
        }
        for y in 0..h as i32 {
            map.set_tile(0, y, TileKind::Wall);
            map.set_tile(w as i32 - 1, y, TileKind::Wall);
        }
        map.set_exit(Cell::new(w as i32 - 1, 1));
        map
    }

    // ── Bounds ──

    #[test]
    fn out_of_bounds_is_wall() {
        let map = arena(&["..", ".."]);
        assert_eq!(map.tile(-1, 0), TileKind::Wall);
        assert_eq!(map.tile(0, -1), TileKind::Wall);
        assert_eq!(map.tile(2, 0), TileKind::Wall);
        assert_eq!(map.tile(0, 2), TileKind::Wall);
        assert!(!map.is_walkable(5, 5));
        assert!(!map.is_hideable(-3, 1));
    }

    #[test]
    fn out_of_bounds_write_is_ignored() {
        let mut map = arena(&["..", ".."]);
        map.set_tile(9, 9, TileKind::Wall);
        map.set_tile(-1, 0, TileKind::Wall);
        assert!(map.rows().all(|r| r.iter().all(|&t| t == TileKind::Floor)));
    }

    #[test]
    fn hideable_only_hide_spots() {
        let map = arena(&[".H#E"]);
        assert!(!map.is_hideable(0, 0));
        assert!(map.is_hideable(1, 0));
        assert!(!map.is_hideable(2, 0));
        assert!(!map.is_hideable(3, 0));
        assert!(!map.is_walkable(1, 0));
        assert!(map.is_walkable(3, 0));
    }

    #[test]
    fn platformer_hides_nothing() {
        let map = TileMap::from_rows(&["PHP"], LevelVariant::Platformer);
        assert!(!map.is_hideable(1, 0));
        assert!(map.is_walkable(0, 0));
    }

    // ── Line of sight ──

    #[test]
    fn los_clear_corridor_is_symmetric() {
        let map = arena(&[
            "##########",
            "#........#",
            "##########",
        ]);
        assert!(map.has_line_of_sight(1, 1, 8, 1));
        assert!(map.has_line_of_sight(8, 1, 1, 1));
    }

    #[test]
    fn los_blocked_by_single_wall() {
        let map = arena(&[
            "##########",
            "#...#....#",
            "##########",
        ]);
        assert!(!map.has_line_of_sight(1, 1, 8, 1));
        assert!(!map.has_line_of_sight(8, 1, 1, 1));
    }

    #[test]
    fn los_diagonal_through_wall() {
        let map = arena(&[
            ".....",
            ".....",
            "..#..",
            ".....",
            ".....",
        ]);
        assert!(!map.has_line_of_sight(0, 0, 4, 4));
        assert!(map.has_line_of_sight(0, 4, 4, 4));
    }

    #[test]
    fn los_target_wall_not_tested() {
        let map = arena(&["...#"]);
        assert!(map.has_line_of_sight(0, 0, 3, 0));
    }

    #[test]
    fn los_same_cell() {
        let map = arena(&["#"]);
        assert!(map.has_line_of_sight(0, 0, 0, 0));
    }

    #[test]
    fn los_hide_spot_does_not_block() {
        let map = arena(&[".H.."]);
        assert!(map.has_line_of_sight(0, 0, 3, 0));
    }

    // ── Sampling ──

    #[test]
    fn random_floor_respects_margin_and_exit_box() {
        let map = open_room(25, 18);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = map.random_floor_position(&mut rng);
            assert!(c.x >= 2 && c.x < 23 && c.y >= 2 && c.y < 16, "{c:?}");
            assert!(map.is_walkable_cell(c));
            assert!(!map.is_near_exit(c));
        }
    }

    #[test]
    fn random_floor_falls_back_to_centre() {
        let map = TileMap::filled(10, 8, TileKind::Wall, LevelVariant::OpenArena);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(map.random_floor_position(&mut rng), Cell::new(5, 4));
    }

    #[test]
    fn candidates_exclude_exit_box() {
        let mut map = open_room(12, 12);
        map.set_exit(Cell::new(11, 5));
        let cands = map.floor_candidates();
        assert!(!cands.contains(&Cell::new(9, 5)));
        assert!(!cands.contains(&Cell::new(9, 3)));
        assert!(cands.contains(&Cell::new(8, 5)));
        assert!(cands.contains(&Cell::new(9, 2)));
    }

    #[test]
    fn player_spawn_clear_of_exit_and_guards() {
        let map = open_room(25, 18);
        let guards = [Cell::new(6, 6), Cell::new(15, 10)];
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..300 {
            let c = map.valid_player_spawn(&guards, &mut rng);
            assert!(!c.within_box(map.exit(), 5), "{c:?}");
            for g in guards {
                assert!(!c.within_box(g, 3), "{c:?} near {g:?}");
            }
        }
    }

    #[test]
    fn player_spawn_falls_back_to_floor_sampling() {
        let map = open_room(9, 9);
        let occupied = [map.center_cell()];
        let mut rng = StdRng::seed_from_u64(3);
        let c = map.valid_player_spawn(&occupied, &mut rng);
        assert!(map.floor_candidates().contains(&c));
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut map = open_room(8, 6);
        let snap = map.snapshot();
        map.set_tile(3, 3, TileKind::Wall);
        map.set_exit(Cell::new(0, 2));
        map.restore(&snap);
        assert_eq!(map.tile(3, 3), TileKind::Floor);
        assert_eq!(map.exit(), Cell::new(7, 1));
        assert_eq!(map.snapshot(), snap);
    }
}
