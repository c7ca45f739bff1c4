/// Errors for the outer shell: terminal, config and logger setup.
/// The simulation itself has no failure paths.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config [{section}]: {reason}")]
    InvalidConfig { section: &'static str, reason: String },

    #[error("logger setup: {0}")]
    Logger(#[from] log::SetLoggerError),
}
