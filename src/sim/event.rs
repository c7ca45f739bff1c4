/// Events emitted during a simulation step.
/// The presentation layer consumes these for the status line.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerSpotted { guard: usize },
    PlayerHid,
    PlayerUnhid,
    BombThrown { x: f64, y: f64 },
    BombsRefilled,
    GuardDistracted { guard: usize },
    DistractionExpired,
    PlayerFell,
    LevelEscaped,
}

impl GameEvent {
    /// Short status-line text.
    pub fn message(&self) -> String {
        match self {
            GameEvent::PlayerSpotted { guard } => format!("Spotted by guard {guard}! Press R to retry"),
            GameEvent::PlayerHid => "Hidden".into(),
            GameEvent::PlayerUnhid => "Out of hiding".into(),
            GameEvent::BombThrown { .. } => "Cherry bomb!".into(),
            GameEvent::BombsRefilled => "Bombs refilled".into(),
            GameEvent::GuardDistracted { guard } => format!("Guard {guard} heads for the noise"),
            GameEvent::DistractionExpired => "The smoke clears".into(),
            GameEvent::PlayerFell => "You fell! Back to the start".into(),
            GameEvent::LevelEscaped => "Escaped! Press Enter for the next level".into(),
        }
    }
}
