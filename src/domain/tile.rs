/// Tile kinds and level-variant semantics.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileKind {
    Floor,
    Wall,
    Exit,
    HideSpot,     // Crate / bush the player can duck into
    Platform,     // Platformer walking surface
    GrapplePoint, // Anchor above a platform
    Gap,          // Platformer void (fall-through)
}

impl TileKind {
    /// Single-character form used by the renderer and test diagrams.
    pub fn glyph(self) -> char {
        match self {
            TileKind::Floor => '.',
            TileKind::Wall => '#',
            TileKind::Exit => 'E',
            TileKind::HideSpot => 'H',
            TileKind::Platform => 'P',
            TileKind::GrapplePoint => 'G',
            TileKind::Gap => ' ',
        }
    }

    pub fn from_glyph(ch: char) -> TileKind {
        match ch {
            '#' => TileKind::Wall,
            'E' => TileKind::Exit,
            'H' => TileKind::HideSpot,
            'P' => TileKind::Platform,
            'G' => TileKind::GrapplePoint,
            ' ' => TileKind::Gap,
            _ => TileKind::Floor,
        }
    }
}

/// Which ruleset a level is played under.
///
/// The variant is a value held by the map, not a subtype: every tile query
/// is routed through it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LevelVariant {
    #[default]
    OpenArena,
    Platformer,
}

impl LevelVariant {
    /// Can an entity occupy a tile of this kind?
    pub fn is_walkable(self, kind: TileKind) -> bool {
        match self {
            LevelVariant::OpenArena => matches!(kind, TileKind::Floor | TileKind::Exit),
            LevelVariant::Platformer => matches!(kind, TileKind::Platform | TileKind::Exit),
        }
    }

    /// Can the player hide in a tile of this kind?
    pub fn is_hideable(self, kind: TileKind) -> bool {
        match self {
            LevelVariant::OpenArena => kind == TileKind::HideSpot,
            LevelVariant::Platformer => false,
        }
    }

    /// Entering this tile means falling out of the level.
    pub fn is_fall_through(self, kind: TileKind) -> bool {
        self == LevelVariant::Platformer && kind == TileKind::Gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_walkability() {
        let v = LevelVariant::OpenArena;
        assert!(v.is_walkable(TileKind::Floor));
        assert!(v.is_walkable(TileKind::Exit));
        assert!(!v.is_walkable(TileKind::Wall));
        assert!(!v.is_walkable(TileKind::HideSpot));
        assert!(!v.is_walkable(TileKind::Platform));
    }

    #[test]
    fn platformer_walkability() {
        let v = LevelVariant::Platformer;
        assert!(v.is_walkable(TileKind::Platform));
        assert!(v.is_walkable(TileKind::Exit));
        assert!(!v.is_walkable(TileKind::Floor));
        assert!(!v.is_walkable(TileKind::Gap));
        assert!(v.is_fall_through(TileKind::Gap));
        assert!(!LevelVariant::OpenArena.is_fall_through(TileKind::Gap));
    }

    #[test]
    fn platformer_never_hides() {
        assert!(LevelVariant::OpenArena.is_hideable(TileKind::HideSpot));
        assert!(!LevelVariant::Platformer.is_hideable(TileKind::HideSpot));
    }
}
