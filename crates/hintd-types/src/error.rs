//! Error types for hintd.

use std::io;

/// Errors produced by the hintd station.
#[derive(Debug, thiserror::Error)]
pub enum HintError {
    #[error("config error: {0}")]
    Config(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("player error: {0}")]
    Player(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("network error: {0}")]
    Net(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HintError>;
