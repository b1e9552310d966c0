//! Boundary traits for the external engines driven by command handlers.
//!
//! The station never decodes media or lays out text itself. Handlers call
//! into a [`MediaPlayer`] and a [`CaptionRenderer`]; the binary plugs in
//! process-backed implementations and tests plug in recorders.

use std::path::Path;

use crate::error::Result;

/// Media playback engine.
///
/// Handlers always drive it as `pause`, `set_media`, `play`.
pub trait MediaPlayer: Send {
    /// Pause (or stop) whatever is currently shown.
    fn pause(&mut self) -> Result<()>;

    /// Select the file to show next. Does not start playback.
    fn set_media(&mut self, path: &Path) -> Result<()>;

    /// Start showing the selected media.
    fn play(&mut self) -> Result<()>;

    /// Report a fatal playback error raised since the last call, if any.
    ///
    /// Called by the worker between commands.
    fn check(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the engine. Called once during shutdown.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Image compositing engine used by `showhint`.
pub trait CaptionRenderer: Send {
    /// Render `text` centred over `background` and write the result to
    /// `output`, replacing any existing file.
    fn render_caption(&self, background: &Path, text: &str, output: &Path) -> Result<()>;
}
