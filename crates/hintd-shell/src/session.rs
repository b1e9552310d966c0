//! Mutable state shared by command handlers.

use std::path::PathBuf;

use hintd_types::backend::{CaptionRenderer, MediaPlayer};
use hintd_types::shutdown::ShutdownSignal;

/// Media directory and the file names resolved against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPaths {
    /// Media directory, always ending with `/` unless empty.
    pub dir: String,
    /// Background image name.
    pub background: String,
    /// Hint background image name.
    pub hint_background: String,
}

impl MediaPaths {
    /// Join `name` onto the media directory.
    ///
    /// This is plain concatenation: a name starting with `/` stays inside
    /// the media directory instead of replacing it.
    pub fn resolve(&self, name: &str) -> PathBuf {
        PathBuf::from(format!("{}{name}", self.dir))
    }

    pub fn background_path(&self) -> PathBuf {
        self.resolve(&self.background)
    }

    pub fn hint_background_path(&self) -> PathBuf {
        self.resolve(&self.hint_background)
    }
}

/// Context handed to every command. Owned by the single thread that runs
/// handlers.
pub struct Session<'a> {
    pub media: MediaPaths,
    pub player: &'a mut dyn MediaPlayer,
    pub captioner: &'a dyn CaptionRenderer,
    pub shutdown: ShutdownSignal,
    caption_slots: usize,
    next_slot: usize,
}

impl<'a> Session<'a> {
    pub fn new(
        media: MediaPaths,
        player: &'a mut dyn MediaPlayer,
        captioner: &'a dyn CaptionRenderer,
        shutdown: ShutdownSignal,
        caption_slots: usize,
    ) -> Self {
        Self {
            media,
            player,
            captioner,
            shutdown,
            caption_slots: caption_slots.max(2),
            next_slot: 0,
        }
    }

    /// Output path for the next rendered caption.
    ///
    /// Cycles `tmp0.png`, `tmp1.png`, ... so a new render never overwrites
    /// the file the player was most recently given.
    pub fn next_caption_path(&mut self) -> PathBuf {
        let slot = self.next_slot;
        self.next_slot = (self.next_slot + 1) % self.caption_slots;
        self.media.resolve(&format!("tmp{slot}.png"))
    }
}
