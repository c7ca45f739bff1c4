/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Clock advance
///   2. Player: hide toggle, bomb, movement, fall-through
///   3. Lure: a fresh bomb sends nearby Standing guards to investigate
///   4. Guard updates
///   5. Detection (any guard seeing the player ends the run)
///   6. Distraction expiry
///   7. Exit check
///
/// Perception reads positions after everyone has moved this tick.

use log::{debug, info};
use rand::Rng;

use crate::domain::distraction::{self, DistractionEffect};
use crate::domain::entity::{FrameInput, HideChange};
use crate::domain::guard::GuardKind;
use crate::domain::perception;
use super::event::GameEvent;
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step<R: Rng + ?Sized>(world: &mut WorldState, input: FrameInput, rng: &mut R) -> Vec<GameEvent> {
    if !world.is_playing() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    world.now_ms += world.settings.tick_rate_ms;

    let bomb = resolve_player(world, &input, &mut events);
    if let Some(b) = bomb {
        resolve_lure(world, &b, &mut events);
        world.distractions.push(b);
    }
    resolve_guards(world, rng);
    resolve_detection(world, &mut events);
    resolve_expiry(world, &mut events);
    resolve_exit(world, &input, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

/// Returns the bomb thrown this tick, if any.
fn resolve_player(world: &mut WorldState, input: &FrameInput, events: &mut Vec<GameEvent>) -> Option<DistractionEffect> {
    let now = world.now_ms;

    match world.player.update_hiding(input, &world.map, now) {
        Some(HideChange::Hid { refilled }) => {
            events.push(GameEvent::PlayerHid);
            if refilled { events.push(GameEvent::BombsRefilled); }
        }
        Some(HideChange::Unhid) => events.push(GameEvent::PlayerUnhid),
        None => {}
    }

    let bomb = if input.bomb_pressed { world.player.use_bomb(now) } else { None };
    if let Some(b) = &bomb {
        debug!("bomb at ({:.0}, {:.0}), {} left", b.origin().x, b.origin().y, world.player.bombs());
        events.push(GameEvent::BombThrown { x: b.origin().x, y: b.origin().y });
    }

    world.player.apply_movement(input, &world.map);

    if world.player.is_falling(&world.map) {
        info!("player fell at {:?}; back to {:?}", world.player.cell(), world.player_spawn);
        world.player.respawn_at(world.player_spawn);
        events.push(GameEvent::PlayerFell);
    }

    bomb
}

// ══════════════════════════════════════════════════════════════
// Lure
// ══════════════════════════════════════════════════════════════

/// Standing guards outside the blast but within earshot walk to it.
fn resolve_lure(world: &mut WorldState, bomb: &DistractionEffect, events: &mut Vec<GameEvent>) {
    let lure_sq = world.settings.lure_radius * world.settings.lure_radius;
    let map = &world.map;
    for g in world.guards.iter_mut() {
        if g.kind() != GuardKind::Standing { continue; }
        let d = g.center().distance_sq(bomb.origin());
        if bomb.covers(g.center()) || d > lure_sq { continue; }
        if g.distract(map, bomb.origin()) {
            events.push(GameEvent::GuardDistracted { guard: g.id });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Guards
// ══════════════════════════════════════════════════════════════

fn resolve_guards<R: Rng + ?Sized>(world: &mut WorldState, rng: &mut R) {
    let now = world.now_ms;
    let map = &world.map;
    for g in world.guards.iter_mut() {
        g.update(map, now, rng);
    }
}

fn resolve_detection(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let spotter = world.guards.iter()
        .find(|g| perception::can_see(*g, Some(&world.player), &world.distractions, &world.map, world.now_ms))
        .map(|g| g.id);
    if let Some(id) = spotter {
        info!("player spotted by guard {id} at {:?}", world.player.cell());
        world.spotted_by = Some(id);
        world.phase = Phase::Spotted;
        events.push(GameEvent::PlayerSpotted { guard: id });
    }
}

// ══════════════════════════════════════════════════════════════
// Timers / win
// ══════════════════════════════════════════════════════════════

fn resolve_expiry(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let removed = distraction::prune_expired(&mut world.distractions, world.now_ms);
    if removed > 0 {
        debug!("{removed} distraction(s) expired");
    }
    events.extend(std::iter::repeat(GameEvent::DistractionExpired).take(removed));
}

fn resolve_exit(world: &mut WorldState, input: &FrameInput, events: &mut Vec<GameEvent>) {
    if world.phase != Phase::Playing || !input.escape_pressed { return; }
    if !world.map.is_at_exit(world.player.cell()) { return; }
    info!("level {} escaped at {} ms", world.level, world.now_ms);
    world.phase = Phase::Escaped;
    events.push(GameEvent::LevelEscaped);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
