/// Entry point, game loop and headless smoke run.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use config::GameConfig;
use domain::entity::FrameInput;
use domain::guard::GuardState;
use error::GameError;
use sim::event::GameEvent;
use sim::step;
use sim::world::{Phase, WorldSettings, WorldState};
use ui::input::{merge_edges, HostCommand, InputState};
use ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const DEFAULT_HEADLESS_TICKS: u64 = 600;
/// How long a transient status message stays up, in ticks.
const MESSAGE_TICKS: u32 = 90;

enum Mode {
    Interactive,
    Headless { ticks: u64 },
}

fn parse_mode() -> Mode {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("--headless") => {
            let ticks = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_HEADLESS_TICKS);
            Mode::Headless { ticks }
        }
        _ => Mode::Interactive,
    }
}

fn main() {
    let mode = parse_mode();
    let (config, problems) = GameConfig::load();

    if let Err(e) = init_logging(&config, &mode) {
        eprintln!("Logger init failed: {e}");
        return;
    }
    for problem in &problems {
        warn!("config: {problem}");
    }

    let mut rng = match config.level.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match mode {
        Mode::Headless { ticks } => run_headless(&config, &mut rng, ticks),
        Mode::Interactive => {
            if let Err(e) = run_interactive(&config, &mut rng) {
                eprintln!("Game error: {e}");
            }
        }
    }
}

/// Stderr belongs to the terminal UI in interactive mode, so logs go to
/// `logging.file` there and are dropped when no file is configured.
fn init_logging(config: &GameConfig, mode: &Mode) -> Result<(), GameError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.logging.level).parse_default_env();

    match (mode, &config.logging.file) {
        (Mode::Headless { .. }, _) => {
            builder.target(env_logger::Target::Stderr);
        }
        (Mode::Interactive, Some(path)) => {
            let file = File::create(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        (Mode::Interactive, None) => return Ok(()),
    }

    builder.try_init()?;
    Ok(())
}

// ── Headless ──

fn run_headless(config: &GameConfig, rng: &mut StdRng, ticks: u64) {
    let mut world = WorldState::new(WorldSettings::from_config(config), rng);
    let mut events = 0usize;

    for _ in 0..ticks {
        events += step::step(&mut world, FrameInput::idle(), rng).len();
        if !world.is_playing() { break; }
    }

    let distracted = world.guards.iter().filter(|g| g.state() == GuardState::Distracted).count();
    info!("headless run finished at tick {}", world.tick);
    println!("level      {}", world.level);
    println!("ticks      {}", world.tick);
    println!("sim time   {} ms", world.now_ms);
    println!("phase      {:?}", world.phase);
    println!("guards     {} ({} distracted)", world.guards.len(), distracted);
    println!("events     {events}");
}

// ── Interactive ──

fn run_interactive(config: &GameConfig, rng: &mut StdRng) -> Result<(), GameError> {
    let mut world = WorldState::new(WorldSettings::from_config(config), rng);
    let mut renderer = Renderer::new();

    let result = renderer
        .init()
        .map_err(GameError::from)
        .and_then(|enhanced| game_loop(&mut world, &mut renderer, rng, config, enhanced));

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result?;

    println!();
    println!("Thanks for playing Shadowgrid! Reached level {}.", world.level);
    Ok(())
}

struct StatusLine {
    text: String,
    ticks_left: u32,
}

impl StatusLine {
    fn set(&mut self, text: String) {
        self.text = text;
        self.ticks_left = MESSAGE_TICKS;
    }

    fn tick(&mut self, world: &WorldState) {
        // Phase messages stay until the phase changes.
        if world.phase != Phase::Playing { return; }
        if self.ticks_left > 0 {
            self.ticks_left -= 1;
            if self.ticks_left == 0 { self.text.clear(); }
        }
    }

    fn clear(&mut self) {
        self.text.clear();
        self.ticks_left = 0;
    }
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    rng: &mut StdRng,
    config: &GameConfig,
    enhanced_keys: bool,
) -> Result<(), GameError> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced_keys;
    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut pending = FrameInput::idle();
    let mut status = StatusLine { text: String::new(), ticks_left: 0 };

    loop {
        kb.drain_events();

        if handle_commands(world, rng, &kb.commands(), &mut status) {
            break;
        }

        pending = merge_edges(pending, kb.frame_input());

        if last_tick.elapsed() >= tick_rate {
            let input = std::mem::replace(&mut pending, FrameInput::idle());
            let events = step::step(world, input, rng);
            if let Some(msg) = headline(&events) {
                status.set(msg);
            }
            status.tick(world);
            last_tick = Instant::now();
        }

        renderer.render(world, &status.text)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Returns true when the player asked to quit.
fn handle_commands(
    world: &mut WorldState,
    rng: &mut StdRng,
    commands: &[HostCommand],
    status: &mut StatusLine,
) -> bool {
    for cmd in commands {
        match cmd {
            HostCommand::Quit => return true,
            HostCommand::TogglePause if world.phase == Phase::Playing => {
                world.paused = !world.paused;
            }
            HostCommand::Restart if world.phase == Phase::Spotted => {
                world.reset_level();
                status.clear();
            }
            HostCommand::NextLevel if world.phase == Phase::Escaped => {
                world.next_level(rng);
                status.set(format!("Level {}", world.level));
            }
            _ => {}
        }
    }
    false
}

/// Phase-ending events win over routine ones.
fn headline(events: &[GameEvent]) -> Option<String> {
    events
        .iter()
        .find(|e| matches!(e, GameEvent::PlayerSpotted { .. } | GameEvent::LevelEscaped))
        .or_else(|| events.last())
        .map(GameEvent::message)
}
