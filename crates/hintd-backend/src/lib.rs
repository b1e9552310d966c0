//! Engine backends for hintd.
//!
//! Implements `MediaPlayer` and `CaptionRenderer` by driving external
//! programs: a media player (VLC's `cvlc` by default) restarted for every
//! new file, and ImageMagick's `identify`/`convert` for hint captions.

mod caption;
mod player;

pub use caption::MagickCaptioner;
pub use player::ProcessPlayer;
