/// World/grid geometry shared by the map, guards and perception.
///
/// World space is continuous (f64 world units, origin top-left, +y down).
/// Grid space is integer cells of `TILE_SIZE` world units each.

pub const TILE_SIZE: f64 = 32.0;

/// A grid cell. Signed so out-of-range queries stay representable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    /// World-space centre of this cell.
    pub fn center(self) -> Point {
        Point::new(
            self.x as f64 * TILE_SIZE + TILE_SIZE / 2.0,
            self.y as f64 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Both axis offsets are within `dist` (a box test, not a true Chebyshev ring).
    pub fn within_box(self, other: Cell, dist: i32) -> bool {
        (self.x - other.x).abs() <= dist && (self.y - other.y).abs() <= dist
    }

    pub fn is_adjacent4(self, other: Cell) -> bool {
        self.manhattan(other) == 1
    }
}

/// A point in world space.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Grid cell containing this point (floor division).
    pub fn cell(self) -> Cell {
        Cell::new(
            (self.x / TILE_SIZE).floor() as i32,
            (self.y / TILE_SIZE).floor() as i32,
        )
    }

    pub fn distance_sq(self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Bearing from `self` to `other` in degrees, atan2 convention (0° = east, +90° = south).
    pub fn bearing_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

/// Wrap an angle in degrees into [-180, 180].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_center_and_back() {
        let c = Cell::new(5, 5);
        let p = c.center();
        assert_eq!(p, Point::new(176.0, 176.0));
        assert_eq!(p.cell(), c);
    }

    #[test]
    fn negative_points_floor_into_negative_cells() {
        assert_eq!(Point::new(-0.5, 10.0).cell(), Cell::new(-1, 0));
    }

    #[test]
    fn bearing_follows_screen_axes() {
        let o = Point::new(0.0, 0.0);
        assert!((o.bearing_to(Point::new(10.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((o.bearing_to(Point::new(0.0, 10.0)) - 90.0).abs() < 1e-9);
        assert!((o.bearing_to(Point::new(-10.0, 0.0)).abs() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_wraps_both_ways() {
        assert!((normalize_angle(270.0) - -90.0).abs() < 1e-9);
        assert!((normalize_angle(-270.0) - 90.0).abs() < 1e-9);
        assert!((normalize_angle(725.0) - 5.0).abs() < 1e-9);
        assert!((normalize_angle(180.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn box_test_is_per_axis() {
        let a = Cell::new(10, 10);
        assert!(a.within_box(Cell::new(13, 7), 3));
        assert!(!a.within_box(Cell::new(14, 10), 3));
    }
}
