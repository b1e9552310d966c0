//! Station configuration loaded from an optional TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Command-line flags are layered on top by the
//! binary.

use std::ffi::OsStr;
use std::path::Path;

use serde::Deserialize;

use crate::error::{HintError, Result};

/// Default UDP port the station listens on.
pub const DEFAULT_PORT: u16 = 40000;

/// Default receive buffer capacity in bytes. One byte is reserved, so the
/// longest accepted command is `DEFAULT_BUFFER_SIZE - 1` bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default maximum number of tokens in a command line.
pub const DEFAULT_MAX_TOKENS: usize = 16;

/// Top-level station configuration (`hintd.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StationConfig {
    pub listener: ListenerSection,
    pub media: MediaSection,
    pub player: PlayerSection,
    pub captioner: CaptionerSection,
}

/// `[listener]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerSection {
    /// Local address to bind.
    pub bind: String,
    /// UDP port.
    pub port: u16,
    /// Receive buffer capacity in bytes.
    pub buffer_size: usize,
    /// Maximum tokens per command line.
    pub max_tokens: usize,
    /// How often the receive loop wakes to check for shutdown (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            poll_interval_ms: 200,
        }
    }
}

/// `[media]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediaSection {
    /// Media directory. `None` means `$HOME/Media/`.
    pub dir: Option<String>,
    /// Background image, relative to the media directory.
    pub background: String,
    /// Background used for captioned hints, relative to the media directory.
    pub hint_background: String,
    /// Number of caption output files to rotate through.
    pub caption_slots: usize,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            dir: None,
            background: "bg.jpg".to_string(),
            hint_background: "hbg.jpg".to_string(),
            caption_slots: 2,
        }
    }
}

/// `[player]` table: the external media player program.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerSection {
    pub program: String,
    /// Arguments placed before the media path.
    pub args: Vec<String>,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            program: "cvlc".to_string(),
            args: vec![
                "--fullscreen".to_string(),
                "--no-video-title-show".to_string(),
                "--image-duration=-1".to_string(),
                "--quiet".to_string(),
            ],
        }
    }
}

/// `[captioner]` table: the ImageMagick programs used to render hints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptionerSection {
    pub convert: String,
    pub identify: String,
    pub font_size: u32,
    pub interline_spacing: u32,
    pub stroke_width: u32,
}

impl Default for CaptionerSection {
    fn default() -> Self {
        Self {
            convert: "convert".to_string(),
            identify: "identify".to_string(),
            font_size: 80,
            interline_spacing: 60,
            stroke_width: 8,
        }
    }
}

impl StationConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HintError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        log::debug!("loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Reject values the station cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.listener.buffer_size < 2 {
            return Err(HintError::Config(
                "listener.buffer_size must be at least 2".to_string(),
            ));
        }
        if self.listener.max_tokens == 0 {
            return Err(HintError::Config(
                "listener.max_tokens must be at least 1".to_string(),
            ));
        }
        if self.media.caption_slots < 2 {
            return Err(HintError::Config(
                "media.caption_slots must be at least 2".to_string(),
            ));
        }
        if self.player.program.is_empty() {
            return Err(HintError::Config("player.program is empty".to_string()));
        }
        Ok(())
    }

    /// Resolve the media directory, falling back to `<home>/Media/`.
    ///
    /// `home` is only consulted when no directory was configured. The result
    /// always ends with `/`.
    pub fn media_dir(&self, home: Option<&OsStr>) -> Result<String> {
        if let Some(dir) = &self.media.dir {
            return Ok(with_trailing_slash(dir.clone()));
        }
        let home = home.ok_or_else(|| {
            HintError::Config("could not determine home directory".to_string())
        })?;
        let mut dir = with_trailing_slash(home.to_string_lossy().into_owned());
        dir.push_str("Media/");
        Ok(dir)
    }
}

/// Append `/` unless the string is empty or already ends with one.
pub fn with_trailing_slash(mut dir: String) -> String {
    if !dir.is_empty() && !dir.ends_with('/') {
        dir.push('/');
    }
    dir
}
