/// Player aggregate: movement, hiding, cherry bombs and class gear.
///
/// The player is a continuous-position box (23×23, centre-anchored). Each
/// tick the host hands over an immutable `FrameInput`; the step function
/// calls `update_hiding`, `use_bomb` and `apply_movement` in that order.

use super::distraction::DistractionEffect;
use super::geom::{Cell, Point};
use super::map::TileMap;
use super::perception::Observable;

pub const PLAYER_SIZE: f64 = 23.0;

/// Speed bonus granted by the Agile class itself (on top of gear).
const AGILE_CLASS_BONUS: f64 = 1.25;

/// Frame input: one immutable snapshot per tick.
/// Movement is continuous (held keys); hide/bomb/escape are edge-triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// -1, 0 or 1.
    pub move_x: i8,
    /// -1, 0 or 1 (positive is down).
    pub move_y: i8,
    pub hide_pressed: bool,
    pub hide_held: bool,
    pub bomb_pressed: bool,
    pub escape_pressed: bool,
}

impl FrameInput {
    pub fn idle() -> Self {
        FrameInput::default()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlayerClass {
    #[default]
    Sneaky,
    Agile,
}

/// Class loadout. Each variant carries its items' multipliers.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Gear {
    /// Shadow Cloak + Silent Boots.
    Sneaky { cloak_vision: f64, boots_speed: f64 },
    /// Swift Boots + Grip Gloves.
    Agile { boots_speed: f64, gloves_speed: f64 },
}

impl Gear {
    pub fn for_class(class: PlayerClass) -> Self {
        match class {
            PlayerClass::Sneaky => Gear::Sneaky { cloak_vision: 0.8, boots_speed: 1.0 },
            PlayerClass::Agile => Gear::Agile { boots_speed: 1.25, gloves_speed: 1.0 },
        }
    }

    pub fn speed_multiplier(&self) -> f64 {
        match *self {
            Gear::Sneaky { boots_speed, .. } => boots_speed,
            Gear::Agile { boots_speed, gloves_speed } => boots_speed * gloves_speed,
        }
    }

    /// Multiplier on guard vision against the wearer.
    pub fn vision_multiplier(&self) -> f64 {
        match *self {
            Gear::Sneaky { cloak_vision, .. } => cloak_vision,
            Gear::Agile { .. } => 1.0,
        }
    }

    pub fn item_names(&self) -> [&'static str; 2] {
        match self {
            Gear::Sneaky { .. } => ["Shadow Cloak", "Silent Boots"],
            Gear::Agile { .. } => ["Swift Boots", "Grip Gloves"],
        }
    }
}

/// Player constants (filled from `[speed]`, `[player]`, `[bomb]` config).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PlayerTuning {
    pub speed: f64,
    pub class: PlayerClass,
    pub hide_cooldown_ms: u64,
    pub hold_to_hide: bool,
    pub max_bombs: u32,
    pub bomb_cooldown_ms: u64,
    pub bomb_radius: f64,
    pub bomb_lifetime_ms: u64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        PlayerTuning {
            speed: 3.0,
            class: PlayerClass::Sneaky,
            hide_cooldown_ms: 1000,
            hold_to_hide: false,
            max_bombs: 2,
            bomb_cooldown_ms: 1000,
            bomb_radius: super::distraction::DEFAULT_RADIUS,
            bomb_lifetime_ms: super::distraction::DEFAULT_LIFETIME_MS,
        }
    }
}

/// What a hide update did, for event emission.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HideChange {
    Hid { refilled: bool },
    Unhid,
}

#[derive(Clone, Debug)]
pub struct Player {
    center: Point,
    hidden: bool,
    near_hideable: bool,
    last_unhide_ms: Option<u64>,
    bombs: u32,
    last_bomb_ms: Option<u64>,
    gear: Gear,
    tuning: PlayerTuning,
}

impl Player {
    pub fn new(cell: Cell, tuning: PlayerTuning) -> Self {
        Player {
            center: cell.center(),
            hidden: false,
            near_hideable: false,
            last_unhide_ms: None,
            bombs: tuning.max_bombs,
            last_bomb_ms: None,
            gear: Gear::for_class(tuning.class),
            tuning,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn cell(&self) -> Cell {
        self.center.cell()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_near_hideable(&self) -> bool {
        self.near_hideable
    }

    pub fn bombs(&self) -> u32 {
        self.bombs
    }

    pub fn max_bombs(&self) -> u32 {
        self.tuning.max_bombs
    }

    pub fn class(&self) -> PlayerClass {
        self.tuning.class
    }

    pub fn gear(&self) -> Gear {
        self.gear
    }

    /// Effective world units per tick.
    pub fn speed(&self) -> f64 {
        let class_bonus = match self.tuning.class {
            PlayerClass::Agile => AGILE_CLASS_BONUS,
            PlayerClass::Sneaky => 1.0,
        };
        self.tuning.speed * class_bonus * self.gear.speed_multiplier()
    }

    /// Put the player back at `cell`, visible, keeping inventory and cooldowns.
    pub fn respawn_at(&mut self, cell: Cell) {
        self.center = cell.center();
        self.hidden = false;
    }
}

// ── Hiding ──

impl Player {
    fn refresh_near_hideable(&mut self, map: &TileMap) {
        let c = self.cell();
        self.near_hideable = (-1..=1)
            .any(|dx| (-1..=1).any(|dy| map.is_hideable(c.x + dx, c.y + dy)));
    }

    fn hide_ready(&self, now_ms: u64) -> bool {
        match self.last_unhide_ms {
            Some(t) => now_ms.saturating_sub(t) >= self.tuning.hide_cooldown_ms,
            None => true,
        }
    }

    fn hide(&mut self) -> HideChange {
        self.hidden = true;
        let refilled = self.bombs < self.tuning.max_bombs;
        self.bombs = self.tuning.max_bombs;
        HideChange::Hid { refilled }
    }

    fn unhide(&mut self, now_ms: u64) -> HideChange {
        self.hidden = false;
        self.last_unhide_ms = Some(now_ms);
        HideChange::Unhid
    }

    /// Toggle mode: a fresh press hides (near a hide spot, out of cooldown)
    /// or unhides. Hold mode: hidden only while the key is held.
    pub fn update_hiding(&mut self, input: &FrameInput, map: &TileMap, now_ms: u64) -> Option<HideChange> {
        self.refresh_near_hideable(map);

        if self.tuning.hold_to_hide {
            if self.hidden && !input.hide_held {
                return Some(self.unhide(now_ms));
            }
            if !self.hidden && input.hide_held && self.near_hideable && self.hide_ready(now_ms) {
                return Some(self.hide());
            }
            return None;
        }

        if !input.hide_pressed { return None; }
        if self.hidden { return Some(self.unhide(now_ms)); }
        if self.near_hideable && self.hide_ready(now_ms) {
            return Some(self.hide());
        }
        None
    }
}

// ── Cherry bombs ──

impl Player {
    /// Throw a bomb at the player's centre if stocked and off cooldown.
    pub fn use_bomb(&mut self, now_ms: u64) -> Option<DistractionEffect> {
        if self.bombs == 0 { return None; }
        if let Some(t) = self.last_bomb_ms {
            if now_ms.saturating_sub(t) <= self.tuning.bomb_cooldown_ms { return None; }
        }
        self.bombs -= 1;
        self.last_bomb_ms = Some(now_ms);
        Some(DistractionEffect::with_params(
            self.center,
            now_ms,
            self.tuning.bomb_radius,
            self.tuning.bomb_lifetime_ms,
        ))
    }
}

// ── Movement ──

impl Player {
    /// Move by the input axis vector, per axis, blocked by solid tiles.
    /// Fall-through tiles can be entered; `is_falling` reports it.
    /// Hidden players stay put. Returns true if the centre changed.
    pub fn apply_movement(&mut self, input: &FrameInput, map: &TileMap) -> bool {
        if self.hidden { return false; }
        let mut dx = input.move_x.signum() as f64;
        let mut dy = input.move_y.signum() as f64;
        if dx == 0.0 && dy == 0.0 { return false; }
        if dx != 0.0 && dy != 0.0 {
            dx *= std::f64::consts::FRAC_1_SQRT_2;
            dy *= std::f64::consts::FRAC_1_SQRT_2;
        }

        let speed = self.speed();
        let before = self.center;
        let nx = self.center.x + dx * speed;
        if map.box_passable(Point::new(nx, self.center.y), PLAYER_SIZE) {
            self.center.x = nx;
        }
        let ny = self.center.y + dy * speed;
        if map.box_passable(Point::new(self.center.x, ny), PLAYER_SIZE) {
            self.center.y = ny;
        }
        self.center != before
    }

    /// Is the centre over a tile the player falls through?
    pub fn is_falling(&self, map: &TileMap) -> bool {
        let c = self.cell();
        map.is_fall_through(c.x, c.y)
    }
}

impl Observable for Player {
    fn center(&self) -> Point {
        self.center
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn is_stealth_class(&self) -> bool {
        self.tuning.class == PlayerClass::Sneaky
    }

    fn vision_multiplier(&self) -> f64 {
        self.gear.vision_multiplier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::LevelVariant;

    fn room() -> TileMap {
        TileMap::from_rows(
            &[
                "#########",
                "#.......#",
                "#.......#",
                "#...H...#",
                "#.......#",
                "#.......#",
                "#########",
            ],
            LevelVariant::OpenArena,
        )
    }

    fn press_hide() -> FrameInput {
        FrameInput { hide_pressed: true, hide_held: true, ..FrameInput::idle() }
    }

    #[test]
    fn class_speeds() {
        let sneaky = Player::new(Cell::new(1, 1), PlayerTuning::default());
        assert!((sneaky.speed() - 3.0).abs() < 1e-9);
        let agile = Player::new(
            Cell::new(1, 1),
            PlayerTuning { class: PlayerClass::Agile, ..PlayerTuning::default() },
        );
        assert!((agile.speed() - 3.0 * 1.25 * 1.25).abs() < 1e-9);
        assert!(sneaky.is_stealth_class());
        assert!(!agile.is_stealth_class());
        assert!((sneaky.vision_multiplier() - 0.8).abs() < 1e-9);
        assert!((agile.vision_multiplier() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn moves_and_stops_at_walls() {
        let map = room();
        let mut p = Player::new(Cell::new(1, 1), PlayerTuning::default());
        let left = FrameInput { move_x: -1, ..FrameInput::idle() };
        for _ in 0..20 {
            p.apply_movement(&left, &map);
        }
        // Box edge never crosses into the wall column.
        assert!(p.center().x - PLAYER_SIZE / 2.0 >= 32.0);
        assert!(!p.apply_movement(&left, &map));
    }

    #[test]
    fn diagonal_is_normalised() {
        let map = room();
        let mut p = Player::new(Cell::new(2, 2), PlayerTuning::default());
        let start = p.center();
        let diag = FrameInput { move_x: 1, move_y: 1, ..FrameInput::idle() };
        assert!(p.apply_movement(&diag, &map));
        assert!((start.distance(p.center()) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn toggle_hide_near_spot_refills_bombs() {
        let map = room();
        let mut p = Player::new(Cell::new(3, 3), PlayerTuning::default());
        assert!(p.use_bomb(0).is_some());
        assert_eq!(p.bombs(), 1);

        assert_eq!(p.update_hiding(&press_hide(), &map, 100), Some(HideChange::Hid { refilled: true }));
        assert!(p.is_hidden());
        assert_eq!(p.bombs(), 2);

        // Hidden players don't move.
        let right = FrameInput { move_x: 1, ..FrameInput::idle() };
        assert!(!p.apply_movement(&right, &map));

        assert_eq!(p.update_hiding(&press_hide(), &map, 200), Some(HideChange::Unhid));
        assert!(!p.is_hidden());
    }

    #[test]
    fn cannot_hide_far_from_spot() {
        let map = room();
        let mut p = Player::new(Cell::new(1, 1), PlayerTuning::default());
        assert_eq!(p.update_hiding(&press_hide(), &map, 0), None);
        assert!(!p.is_near_hideable());
    }

    #[test]
    fn hide_cooldown_after_unhide() {
        let map = room();
        let mut p = Player::new(Cell::new(4, 4), PlayerTuning::default());
        p.update_hiding(&press_hide(), &map, 0);
        p.update_hiding(&press_hide(), &map, 100);
        assert_eq!(p.update_hiding(&press_hide(), &map, 600), None);
        assert!(matches!(p.update_hiding(&press_hide(), &map, 1100), Some(HideChange::Hid { .. })));
    }

    #[test]
    fn hold_mode_unhides_on_release() {
        let map = room();
        let tuning = PlayerTuning { hold_to_hide: true, ..PlayerTuning::default() };
        let mut p = Player::new(Cell::new(3, 4), tuning);
        let held = FrameInput { hide_held: true, ..FrameInput::idle() };
        assert!(matches!(p.update_hiding(&held, &map, 0), Some(HideChange::Hid { .. })));
        assert_eq!(p.update_hiding(&held, &map, 16), None);
        assert!(p.is_hidden());
        assert_eq!(p.update_hiding(&FrameInput::idle(), &map, 32), Some(HideChange::Unhid));
    }

    #[test]
    fn bombs_respect_stock_and_cooldown() {
        let mut p = Player::new(Cell::new(2, 2), PlayerTuning::default());
        let b = p.use_bomb(0).unwrap();
        assert_eq!(b.origin(), p.center());
        assert!(p.use_bomb(1000).is_none());
        assert!(p.use_bomb(1001).is_some());
        assert_eq!(p.bombs(), 0);
        assert!(p.use_bomb(5000).is_none());
    }

    #[test]
    fn gap_is_fall_through_on_platforms() {
        let map = TileMap::from_rows(&["PP PP", "PPPPP"], LevelVariant::Platformer);
        let mut p = Player::new(Cell::new(1, 0), PlayerTuning::default());
        assert!(!p.is_falling(&map));
        p.respawn_at(Cell::new(2, 0));
        assert!(p.is_falling(&map));
    }
}
