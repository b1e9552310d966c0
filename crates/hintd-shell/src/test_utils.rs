//! Test doubles for handler, interpreter and receive-loop tests.
//!
//! Recorders share their logs through `Arc<Mutex<..>>` so a clone kept by
//! the test sees calls made on another thread.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use hintd_types::backend::{CaptionRenderer, MediaPlayer};
use hintd_types::error::{HintError, Result};

use crate::interpreter::Command;
use crate::session::{MediaPaths, Session};
use crate::tokenizer::TokenVector;

/// Media paths under `dir` with the default file names.
pub fn media_paths(dir: &str) -> MediaPaths {
    MediaPaths {
        dir: dir.to_string(),
        background: "bg.jpg".to_string(),
        hint_background: "hbg.jpg".to_string(),
    }
}

/// A call made on a [`RecordingPlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Pause,
    SetMedia(PathBuf),
    Play,
}

/// Player that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    calls: Arc<Mutex<Vec<PlayerCall>>>,
    fatal: Arc<Mutex<Option<String>>>,
    /// Make `play` fail.
    pub fail_play: bool,
}

impl RecordingPlayer {
    /// A player whose `play` always fails.
    pub fn failing() -> Self {
        Self {
            fail_play: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Paths passed to `set_media`, in order.
    pub fn media(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlayerCall::SetMedia(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Make the next `check` report a fatal error.
    pub fn raise_fatal(&self, message: &str) {
        if let Ok(mut fatal) = self.fatal.lock() {
            *fatal = Some(message.to_string());
        }
    }

    fn push(&self, call: PlayerCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl MediaPlayer for RecordingPlayer {
    fn pause(&mut self) -> Result<()> {
        self.push(PlayerCall::Pause);
        Ok(())
    }

    fn set_media(&mut self, path: &Path) -> Result<()> {
        self.push(PlayerCall::SetMedia(path.to_path_buf()));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.push(PlayerCall::Play);
        if self.fail_play {
            return Err(HintError::Player("playback refused".to_string()));
        }
        Ok(())
    }

    fn check(&mut self) -> Result<()> {
        match self.fatal.lock().ok().and_then(|mut f| f.take()) {
            Some(message) => Err(HintError::Player(message)),
            None => Ok(()),
        }
    }
}

/// A render request made on a [`RecordingCaptioner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub background: PathBuf,
    pub text: String,
    pub output: PathBuf,
}

/// Caption renderer that records requests instead of drawing.
#[derive(Debug, Clone, Default)]
pub struct RecordingCaptioner {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    /// Make every render fail, like an unreadable background image.
    pub fail: bool,
}

impl RecordingCaptioner {
    /// A captioner whose renders always fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CaptionRenderer for RecordingCaptioner {
    fn render_caption(&self, background: &Path, text: &str, output: &Path) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RenderCall {
                background: background.to_path_buf(),
                text: text.to_string(),
                output: output.to_path_buf(),
            });
        }
        if self.fail {
            return Err(HintError::Render(format!(
                "unable to open image {}",
                background.display()
            )));
        }
        Ok(())
    }
}

/// Command that records each argument vector it is invoked with.
#[derive(Clone)]
pub struct RecordingCommand {
    name: String,
    invocations: Arc<Mutex<Vec<Vec<String>>>>,
    /// Status to report: `Ok` for 0, a command error otherwise.
    pub fail: bool,
}

impl RecordingCommand {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            invocations: Arc::default(),
            fail: false,
        }
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

impl Command for RecordingCommand {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        "Record invocations"
    }
    fn usage(&self) -> &str {
        &self.name
    }
    fn execute(&self, argv: &TokenVector, _session: &mut Session<'_>) -> Result<()> {
        if let Ok(mut inv) = self.invocations.lock() {
            inv.push(argv.as_slice().to_vec());
        }
        if self.fail {
            return Err(HintError::Command(format!("{} failed", self.name)));
        }
        Ok(())
    }
}
