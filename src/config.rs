/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or
/// `~/.local/share/shadowgrid`). Falls back to defaults if the file is
/// missing or incomplete. A section that fails validation is replaced by
/// its defaults; the problems are handed back so `main` can log them once
/// the logger is up.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::entity::{PlayerClass, PlayerTuning};
use crate::domain::guard::{FacingPolicy, GuardTuning};
use crate::domain::tile::LevelVariant;
use crate::error::GameError;

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub guard: GuardConfig,
    pub bomb: BombConfig,
    pub player: PlayerConfig,
    pub level: LevelConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
    pub player_speed: f64,  // world units per tick
    pub guard_speed: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GuardConfig {
    pub standing_vision: f64,
    pub moving_vision: f64,
    pub repath_attempts: u32,
    pub idle_min_ms: u64,
    pub idle_max_ms: u64,
    pub waypoint_epsilon: f64,
    pub standing_facing: FacingPolicy,
    pub standing_count: usize,
    pub moving_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BombConfig {
    pub radius: f64,
    pub lifetime_ms: u64,
    pub cooldown_ms: u64,
    pub max_bombs: u32,
    pub lure_radius: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerConfig {
    pub hide_cooldown_ms: u64,
    pub hold_to_hide: bool,
    pub class: PlayerClass,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelConfig {
    pub variant: LevelVariant,
    pub interior_walls: u32,
    pub hide_spots: u32,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: log::LevelFilter,
    pub file: Option<PathBuf>,
}

impl GameConfig {
    pub fn guard_tuning(&self) -> GuardTuning {
        GuardTuning {
            standing_vision: self.guard.standing_vision,
            moving_vision: self.guard.moving_vision,
            speed: self.speed.guard_speed,
            repath_attempts: self.guard.repath_attempts,
            idle_min_ms: self.guard.idle_min_ms,
            idle_max_ms: self.guard.idle_max_ms,
            waypoint_epsilon: self.guard.waypoint_epsilon,
            standing_facing: self.guard.standing_facing,
        }
    }

    pub fn player_tuning(&self) -> PlayerTuning {
        PlayerTuning {
            speed: self.speed.player_speed,
            class: self.player.class,
            hide_cooldown_ms: self.player.hide_cooldown_ms,
            hold_to_hide: self.player.hold_to_hide,
            max_bombs: self.bomb.max_bombs,
            bomb_cooldown_ms: self.bomb.cooldown_ms,
            bomb_radius: self.bomb.radius,
            bomb_lifetime_ms: self.bomb.lifetime_ms,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            speed: SpeedConfig::default(),
            guard: GuardConfig::default(),
            bomb: BombConfig::default(),
            player: TomlPlayer::default().convert(),
            level: TomlLevel::default().convert(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        SpeedConfig {
            tick_rate_ms: default_tick_rate(),
            player_speed: default_player_speed(),
            guard_speed: default_guard_speed(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            standing_vision: default_standing_vision(),
            moving_vision: default_moving_vision(),
            repath_attempts: default_repath_attempts(),
            idle_min_ms: default_idle_min(),
            idle_max_ms: default_idle_max(),
            waypoint_epsilon: default_waypoint_epsilon(),
            standing_facing: FacingPolicy::ClockModulo,
            standing_count: default_guard_count(),
            moving_count: default_guard_count(),
        }
    }
}

impl Default for BombConfig {
    fn default() -> Self {
        BombConfig {
            radius: default_bomb_radius(),
            lifetime_ms: default_bomb_lifetime(),
            cooldown_ms: default_bomb_cooldown(),
            max_bombs: default_max_bombs(),
            lure_radius: default_lure_radius(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: log::LevelFilter::Info, file: None }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    guard: TomlGuard,
    #[serde(default)]
    bomb: TomlBomb,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    level: TomlLevel,
    #[serde(default)]
    logging: TomlLogging,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_player_speed")]
    player_speed: f64,
    #[serde(default = "default_guard_speed")]
    guard_speed: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum TomlFacing {
    Clock,
    Sweep,
}

#[derive(Deserialize, Debug)]
struct TomlGuard {
    #[serde(default = "default_standing_vision")]
    standing_vision: f64,
    #[serde(default = "default_moving_vision")]
    moving_vision: f64,
    #[serde(default = "default_repath_attempts")]
    repath_attempts: u32,
    #[serde(default = "default_idle_min")]
    idle_min_ms: u64,
    #[serde(default = "default_idle_max")]
    idle_max_ms: u64,
    #[serde(default = "default_waypoint_epsilon")]
    waypoint_epsilon: f64,
    #[serde(default = "default_standing_facing")]
    standing_facing: TomlFacing,
    #[serde(default = "default_sweep_speed")]
    sweep_deg_per_sec: f64,
    #[serde(default = "default_guard_count")]
    standing_count: usize,
    #[serde(default = "default_guard_count")]
    moving_count: usize,
}

#[derive(Deserialize, Debug)]
struct TomlBomb {
    #[serde(default = "default_bomb_radius")]
    radius: f64,
    #[serde(default = "default_bomb_lifetime")]
    lifetime_ms: u64,
    #[serde(default = "default_bomb_cooldown")]
    cooldown_ms: u64,
    #[serde(default = "default_max_bombs")]
    max_bombs: u32,
    #[serde(default = "default_lure_radius")]
    lure_radius: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum TomlClass {
    Sneaky,
    Agile,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_hide_cooldown")]
    hide_cooldown_ms: u64,
    #[serde(default)]
    hold_to_hide: bool,
    #[serde(default = "default_class")]
    class: TomlClass,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum TomlVariant {
    Arena,
    Platform,
}

#[derive(Deserialize, Debug)]
struct TomlLevel {
    #[serde(default = "default_variant")]
    variant: TomlVariant,
    #[serde(default = "default_interior_walls")]
    interior_walls: u32,
    #[serde(default = "default_hide_spots")]
    hide_spots: u32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlLogging {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default)]
    file: Option<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }
fn default_player_speed() -> f64 { 3.0 }
fn default_guard_speed() -> f64 { 1.5 }
fn default_standing_vision() -> f64 { 100.0 }
fn default_moving_vision() -> f64 { 60.0 }
fn default_repath_attempts() -> u32 { 50 }
fn default_idle_min() -> u64 { 1000 }
fn default_idle_max() -> u64 { 3000 }
fn default_waypoint_epsilon() -> f64 { 2.0 }
fn default_standing_facing() -> TomlFacing { TomlFacing::Clock }
fn default_sweep_speed() -> f64 { 45.0 }
fn default_guard_count() -> usize { 1 }
fn default_bomb_radius() -> f64 { 100.0 }
fn default_bomb_lifetime() -> u64 { 5000 }
fn default_bomb_cooldown() -> u64 { 1000 }
fn default_max_bombs() -> u32 { 2 }
fn default_lure_radius() -> f64 { 200.0 }
fn default_hide_cooldown() -> u64 { 1000 }
fn default_class() -> TomlClass { TomlClass::Sneaky }
fn default_variant() -> TomlVariant { TomlVariant::Arena }
fn default_interior_walls() -> u32 { 5 }
fn default_hide_spots() -> u32 { 8 }
fn default_log_level() -> String { "info".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            tick_rate_ms: default_tick_rate(),
            player_speed: default_player_speed(),
            guard_speed: default_guard_speed(),
        }
    }
}

impl Default for TomlGuard {
    fn default() -> Self {
        TomlGuard {
            standing_vision: default_standing_vision(),
            moving_vision: default_moving_vision(),
            repath_attempts: default_repath_attempts(),
            idle_min_ms: default_idle_min(),
            idle_max_ms: default_idle_max(),
            waypoint_epsilon: default_waypoint_epsilon(),
            standing_facing: default_standing_facing(),
            sweep_deg_per_sec: default_sweep_speed(),
            standing_count: default_guard_count(),
            moving_count: default_guard_count(),
        }
    }
}

impl Default for TomlBomb {
    fn default() -> Self {
        TomlBomb {
            radius: default_bomb_radius(),
            lifetime_ms: default_bomb_lifetime(),
            cooldown_ms: default_bomb_cooldown(),
            max_bombs: default_max_bombs(),
            lure_radius: default_lure_radius(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            hide_cooldown_ms: default_hide_cooldown(),
            hold_to_hide: false,
            class: default_class(),
        }
    }
}

impl Default for TomlLevel {
    fn default() -> Self {
        TomlLevel {
            variant: default_variant(),
            interior_walls: default_interior_walls(),
            hide_spots: default_hide_spots(),
            seed: None,
        }
    }
}

impl Default for TomlLogging {
    fn default() -> Self {
        TomlLogging {
            level: default_log_level(),
            file: None,
        }
    }
}

// ── Conversion + validation ──

fn invalid(section: &'static str, reason: impl Into<String>) -> GameError {
    GameError::InvalidConfig { section, reason: reason.into() }
}

/// Take `value` if it validates, else the section default plus the error.
fn checked<T>(
    value: Result<T, GameError>,
    fallback: impl FnOnce() -> T,
    problems: &mut Vec<GameError>,
) -> T {
    match value {
        Ok(v) => v,
        Err(e) => {
            problems.push(e);
            fallback()
        }
    }
}

impl TomlSpeed {
    fn convert(&self) -> Result<SpeedConfig, GameError> {
        if self.tick_rate_ms == 0 { return Err(invalid("speed", "tick_rate_ms must be > 0")); }
        if !(self.player_speed > 0.0) { return Err(invalid("speed", "player_speed must be > 0")); }
        if !(self.guard_speed > 0.0) { return Err(invalid("speed", "guard_speed must be > 0")); }
        Ok(SpeedConfig {
            tick_rate_ms: self.tick_rate_ms,
            player_speed: self.player_speed,
            guard_speed: self.guard_speed,
        })
    }
}

impl TomlGuard {
    fn convert(&self) -> Result<GuardConfig, GameError> {
        if !(self.standing_vision > 0.0) || !(self.moving_vision > 0.0) {
            return Err(invalid("guard", "vision radii must be > 0"));
        }
        if self.repath_attempts == 0 { return Err(invalid("guard", "repath_attempts must be > 0")); }
        if self.idle_min_ms >= self.idle_max_ms {
            return Err(invalid(
                "guard",
                format!("idle_min_ms ({}) must be below idle_max_ms ({})", self.idle_min_ms, self.idle_max_ms),
            ));
        }
        if !(self.waypoint_epsilon > 0.0) { return Err(invalid("guard", "waypoint_epsilon must be > 0")); }
        if !self.sweep_deg_per_sec.is_finite() {
            return Err(invalid("guard", "sweep_deg_per_sec must be finite"));
        }
        let standing_facing = match self.standing_facing {
            TomlFacing::Clock => FacingPolicy::ClockModulo,
            TomlFacing::Sweep => FacingPolicy::Sweep { degrees_per_sec: self.sweep_deg_per_sec },
        };
        Ok(GuardConfig {
            standing_vision: self.standing_vision,
            moving_vision: self.moving_vision,
            repath_attempts: self.repath_attempts,
            idle_min_ms: self.idle_min_ms,
            idle_max_ms: self.idle_max_ms,
            waypoint_epsilon: self.waypoint_epsilon,
            standing_facing,
            standing_count: self.standing_count,
            moving_count: self.moving_count,
        })
    }
}

impl TomlBomb {
    fn convert(&self) -> Result<BombConfig, GameError> {
        if !(self.radius > 0.0) { return Err(invalid("bomb", "radius must be > 0")); }
        if !(self.lure_radius >= 0.0) { return Err(invalid("bomb", "lure_radius must be >= 0")); }
        Ok(BombConfig {
            radius: self.radius,
            lifetime_ms: self.lifetime_ms,
            cooldown_ms: self.cooldown_ms,
            max_bombs: self.max_bombs,
            lure_radius: self.lure_radius,
        })
    }
}

impl TomlPlayer {
    fn convert(&self) -> PlayerConfig {
        PlayerConfig {
            hide_cooldown_ms: self.hide_cooldown_ms,
            hold_to_hide: self.hold_to_hide,
            class: match self.class {
                TomlClass::Sneaky => PlayerClass::Sneaky,
                TomlClass::Agile => PlayerClass::Agile,
            },
        }
    }
}

impl TomlLevel {
    fn convert(&self) -> LevelConfig {
        LevelConfig {
            variant: match self.variant {
                TomlVariant::Arena => LevelVariant::OpenArena,
                TomlVariant::Platform => LevelVariant::Platformer,
            },
            interior_walls: self.interior_walls,
            hide_spots: self.hide_spots,
            seed: self.seed,
        }
    }
}

impl TomlLogging {
    fn convert(&self) -> Result<LoggingConfig, GameError> {
        let level = self.level.parse::<log::LevelFilter>()
            .map_err(|_| invalid("logging", format!("unknown level {:?}", self.level)))?;
        Ok(LoggingConfig { level, file: self.file.as_ref().map(PathBuf::from) })
    }
}

impl TomlConfig {
    fn resolve(&self) -> (GameConfig, Vec<GameError>) {
        let mut problems = Vec::new();
        let cfg = GameConfig {
            speed: checked(self.speed.convert(), SpeedConfig::default, &mut problems),
            guard: checked(self.guard.convert(), GuardConfig::default, &mut problems),
            bomb: checked(self.bomb.convert(), BombConfig::default, &mut problems),
            player: self.player.convert(),
            level: self.level.convert(),
            logging: checked(self.logging.convert(), LoggingConfig::default, &mut problems),
        };
        (cfg, problems)
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory, (3) XDG data dir.
    /// Missing file or missing keys gracefully fall back to defaults.
    /// Returned errors are non-fatal and already compensated for.
    pub fn load() -> (Self, Vec<GameError>) {
        let search_dirs = candidate_dirs();
        let mut problems = Vec::new();
        let toml_cfg = load_toml(&search_dirs, &mut problems);
        let (cfg, mut invalid) = toml_cfg.resolve();
        problems.append(&mut invalid);
        (cfg, problems)
    }

    /// Parse a config document directly.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<(Self, Vec<GameError>), GameError> {
        let raw = toml::from_str::<TomlConfig>(text)
            .map_err(|source| GameError::ConfigParse { path: path.to_path_buf(), source })?;
        Ok(raw.resolve())
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/shadowgrid)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/shadowgrid");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf], problems: &mut Vec<GameError>) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(source) => {
                        problems.push(GameError::ConfigParse { path, source });
                        return TomlConfig::default();
                    }
                },
                Err(e) => problems.push(GameError::Io(e)),
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (GameConfig, Vec<GameError>) {
        GameConfig::from_toml_str(text, Path::new("config.toml")).unwrap()
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let (cfg, problems) = parse("");
        assert!(problems.is_empty());
        assert_eq!(cfg, GameConfig::default());
        assert_eq!(cfg.speed.tick_rate_ms, 16);
        assert_eq!(cfg.guard.standing_facing, FacingPolicy::ClockModulo);
        assert_eq!(cfg.level.variant, LevelVariant::OpenArena);
        assert_eq!(cfg.logging.level, log::LevelFilter::Info);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let (cfg, problems) = parse(
            "[guard]\nstanding_facing = \"sweep\"\nsweep_deg_per_sec = 90.0\n\
             [level]\nvariant = \"platform\"\nseed = 7\n\
             [player]\nclass = \"agile\"\n",
        );
        assert!(problems.is_empty());
        assert_eq!(cfg.guard.standing_facing, FacingPolicy::Sweep { degrees_per_sec: 90.0 });
        assert_eq!(cfg.guard.moving_vision, 60.0);
        assert_eq!(cfg.level.variant, LevelVariant::Platformer);
        assert_eq!(cfg.level.seed, Some(7));
        assert_eq!(cfg.player_tuning().class, PlayerClass::Agile);
    }

    #[test]
    fn invalid_section_falls_back_alone() {
        let (cfg, problems) = parse(
            "[guard]\nidle_min_ms = 5000\nidle_max_ms = 1000\n[bomb]\nradius = 150.0\n",
        );
        assert_eq!(problems.len(), 1);
        assert!(matches!(problems[0], GameError::InvalidConfig { section: "guard", .. }));
        assert_eq!(cfg.guard.idle_min_ms, 1000);
        assert_eq!(cfg.guard.idle_max_ms, 3000);
        assert_eq!(cfg.bomb.radius, 150.0);
    }

    #[test]
    fn bad_log_level_is_reported() {
        let (cfg, problems) = parse("[logging]\nlevel = \"loud\"\n");
        assert_eq!(problems.len(), 1);
        assert_eq!(cfg.logging.level, log::LevelFilter::Info);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = GameConfig::from_toml_str("[speed\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, GameError::ConfigParse { .. }));
    }

    #[test]
    fn every_rejected_section_is_reported() {
        let (cfg, problems) = parse(
            "[speed]\ntick_rate_ms = 0\n[guard]\nidle_min_ms = 3000\n[bomb]\nradius = -1.0\n",
        );
        let sections: Vec<_> = problems
            .iter()
            .filter_map(|p| match p {
                GameError::InvalidConfig { section, .. } => Some(*section),
                _ => None,
            })
            .collect();
        assert_eq!(sections, ["speed", "guard", "bomb"]);
        assert_eq!(cfg.speed, SpeedConfig::default());
        assert_eq!(cfg.bomb, BombConfig::default());
    }

    #[test]
    fn tunings_carry_config_values() {
        let (cfg, _) = parse("[speed]\nguard_speed = 2.5\n[bomb]\nmax_bombs = 4\n");
        assert_eq!(cfg.guard_tuning().speed, 2.5);
        assert_eq!(cfg.player_tuning().max_bombs, 4);
    }
}
