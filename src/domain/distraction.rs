/// Cherry-bomb distraction: a timed, radius-bounded decoy.
///
/// Created at a world point, active until `lifetime_ms` has elapsed since
/// creation, then pruned by the owning tick. Nothing about an effect changes
/// after creation; "active" is derived from the clock.

use super::geom::Point;

pub const DEFAULT_RADIUS: f64 = 100.0;
pub const DEFAULT_LIFETIME_MS: u64 = 5000;

#[derive(Clone, Debug, PartialEq)]
pub struct DistractionEffect {
    origin: Point,
    radius: f64,
    created_ms: u64,
    lifetime_ms: u64,
}

impl DistractionEffect {
    pub fn new(origin: Point, created_ms: u64) -> Self {
        Self::with_params(origin, created_ms, DEFAULT_RADIUS, DEFAULT_LIFETIME_MS)
    }

    pub fn with_params(origin: Point, created_ms: u64, radius: f64, lifetime_ms: u64) -> Self {
        DistractionEffect { origin, radius, created_ms, lifetime_ms }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn created_ms(&self) -> u64 {
        self.created_ms
    }

    /// Still active at `now_ms`? Turns false once elapsed exceeds the lifetime.
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_ms) <= self.lifetime_ms
    }

    /// Fraction of the lifetime used: 0.0 at creation, 1.0 at expiry.
    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.lifetime_ms == 0 { return 1.0; }
        (now_ms.saturating_sub(self.created_ms) as f64 / self.lifetime_ms as f64).min(1.0)
    }

    /// Is `point` inside the effect's radius (inclusive)?
    pub fn covers(&self, point: Point) -> bool {
        self.origin.distance_sq(point) <= self.radius * self.radius
    }

    /// Does the effect reach a guard centred at `guard_center` right now?
    pub fn affects(&self, guard_center: Point, now_ms: u64) -> bool {
        self.is_active(now_ms) && self.covers(guard_center)
    }
}

/// Drop every expired effect in place. Returns how many were removed.
pub fn prune_expired(effects: &mut Vec<DistractionEffect>, now_ms: u64) -> usize {
    let before = effects.len();
    effects.retain(|e| e.is_active(now_ms));
    before - effects.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_through_lifetime_then_expires() {
        let e = DistractionEffect::new(Point::new(0.0, 0.0), 0);
        assert!(e.is_active(0));
        assert!(e.is_active(4000));
        assert!(e.is_active(5000));
        assert!(!e.is_active(5001));
    }

    #[test]
    fn affects_guard_inside_radius_only_while_active() {
        let e = DistractionEffect::new(Point::new(100.0, 100.0), 0);
        let near = Point::new(160.0, 180.0); // distance 100
        let far = Point::new(201.0, 100.0);
        assert!(e.affects(near, 4000));
        assert!(!e.affects(near, 5001));
        assert!(!e.affects(far, 0));
    }

    #[test]
    fn created_later_is_measured_from_creation() {
        let e = DistractionEffect::new(Point::new(0.0, 0.0), 10_000);
        assert!(e.is_active(14_000));
        assert!(!e.is_active(15_001));
        // Clock readings before creation count as zero elapsed.
        assert!(e.is_active(9_000));
    }

    #[test]
    fn progress_clamps() {
        let e = DistractionEffect::new(Point::new(0.0, 0.0), 1000);
        assert!((e.progress(1000) - 0.0).abs() < 1e-9);
        assert!((e.progress(3500) - 0.5).abs() < 1e-9);
        assert!((e.progress(99_000) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prune_removes_only_expired() {
        let mut list = vec![
            DistractionEffect::new(Point::new(0.0, 0.0), 0),
            DistractionEffect::new(Point::new(0.0, 0.0), 3000),
        ];
        assert_eq!(prune_expired(&mut list, 6000), 1);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].created_ms(), 3000);
        assert_eq!(prune_expired(&mut list, 8001), 1);
        assert!(list.is_empty());
    }
}
