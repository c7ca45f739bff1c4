/// Input state tracker and key bindings.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous movement while a key is held
///   - Edge-triggered hide / bomb / escape (only fire on initial press)
///   - Movement and actions in the same tick
///
/// Honors Release events when the terminal reports them (keyboard
/// enhancement). Otherwise a key counts as released after `HOLD_TIMEOUT`
/// without a Press/Repeat.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Bindings ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_HIDE: &[KeyCode] = &[KeyCode::Char('h'), KeyCode::Char('H')];
const KEYS_BOMB: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_ESCAPE: &[KeyCode] = &[KeyCode::Char('e'), KeyCode::Char('E')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_NEXT: &[KeyCode] = &[KeyCode::Enter];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc];

/// Host-level commands, outside the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HostCommand {
    Quit,
    TogglePause,
    Restart,
    NextLevel,
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the latest `drain_events`.
    fresh_presses: Vec<KeyCode>,

    raw_events: Vec<KeyEvent>,

    /// Only true when keyboard enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame, before the tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, at: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(key.code, at);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.is_held_at(code, Instant::now())
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    // ── Translation ──

    /// Snapshot for one simulation tick.
    ///
    /// Fresh presses are edge events and are consumed by the first tick
    /// after the drain; callers accumulate them across frames between ticks.
    pub fn frame_input(&self) -> FrameInput {
        let axis = |neg: &[KeyCode], pos: &[KeyCode]| -> i8 {
            let n = self.any_held(neg) || self.any_pressed(neg);
            let p = self.any_held(pos) || self.any_pressed(pos);
            match (n, p) {
                (true, false) => -1,
                (false, true) => 1,
                _ => 0,
            }
        };
        FrameInput {
            move_x: axis(KEYS_LEFT, KEYS_RIGHT),
            move_y: axis(KEYS_UP, KEYS_DOWN),
            hide_pressed: self.any_pressed(KEYS_HIDE),
            hide_held: self.any_held(KEYS_HIDE),
            bomb_pressed: self.any_pressed(KEYS_BOMB),
            escape_pressed: self.any_pressed(KEYS_ESCAPE),
        }
    }

    /// Host commands pressed this frame, in priority order.
    pub fn commands(&self) -> Vec<HostCommand> {
        let mut out = Vec::new();
        if self.ctrl_c_pressed() || self.any_pressed(KEYS_QUIT) { out.push(HostCommand::Quit); }
        if self.any_pressed(KEYS_PAUSE) { out.push(HostCommand::TogglePause); }
        if self.any_pressed(KEYS_RESTART) { out.push(HostCommand::Restart); }
        if self.any_pressed(KEYS_NEXT) { out.push(HostCommand::NextLevel); }
        out
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, at: Instant) -> bool {
        self.last_active.get(&code)
            .map(|t| at.saturating_duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

/// Merge edge-triggered flags from frames that ran between two ticks.
pub fn merge_edges(pending: FrameInput, latest: FrameInput) -> FrameInput {
    FrameInput {
        hide_pressed: pending.hide_pressed || latest.hide_pressed,
        bomb_pressed: pending.bomb_pressed || latest.bomb_pressed,
        escape_pressed: pending.escape_pressed || latest.escape_pressed,
        ..latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn press_is_fresh_once_then_held() {
        let mut st = InputState::new();
        let t0 = Instant::now();
        st.record(key(KeyCode::Char('h'), KeyEventKind::Press), t0);
        assert!(st.frame_input().hide_pressed);
        assert!(st.frame_input().hide_held);

        st.fresh_presses.clear();
        st.record(key(KeyCode::Char('h'), KeyEventKind::Repeat), t0);
        let f = st.frame_input();
        assert!(!f.hide_pressed);
        assert!(f.hide_held);
    }

    #[test]
    fn opposite_directions_cancel() {
        let mut st = InputState::new();
        let t0 = Instant::now();
        st.record(key(KeyCode::Left, KeyEventKind::Press), t0);
        st.record(key(KeyCode::Char('d'), KeyEventKind::Press), t0);
        st.record(key(KeyCode::Up, KeyEventKind::Press), t0);
        let f = st.frame_input();
        assert_eq!((f.move_x, f.move_y), (0, -1));
    }

    #[test]
    fn release_only_counts_with_enhancement() {
        let mut st = InputState::new();
        let t0 = Instant::now();
        st.record(key(KeyCode::Right, KeyEventKind::Press), t0);
        st.record(key(KeyCode::Right, KeyEventKind::Release), t0);
        assert!(st.is_held(KeyCode::Right));

        st.honor_release = true;
        st.record(key(KeyCode::Right, KeyEventKind::Release), t0);
        assert!(!st.is_held(KeyCode::Right));
    }

    #[test]
    fn host_commands() {
        let mut st = InputState::new();
        let t0 = Instant::now();
        st.record(key(KeyCode::Char('p'), KeyEventKind::Press), t0);
        st.record(key(KeyCode::Enter, KeyEventKind::Press), t0);
        assert_eq!(st.commands(), vec![HostCommand::TogglePause, HostCommand::NextLevel]);
        st.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), t0);
        assert_eq!(st.commands()[0], HostCommand::Quit);
    }

    #[test]
    fn edges_survive_until_the_tick() {
        let first = FrameInput { bomb_pressed: true, move_x: 1, ..FrameInput::idle() };
        let second = FrameInput { move_x: -1, ..FrameInput::idle() };
        let merged = merge_edges(first, second);
        assert!(merged.bomb_pressed);
        assert_eq!(merged.move_x, -1);
    }
}
