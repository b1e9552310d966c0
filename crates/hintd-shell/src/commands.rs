//! Station commands: `showhint`, `showbg`, `playmedia`, `exit`.
//!
//! Each handler composes paths under the media directory and forwards to
//! the engines held by the session. Engine errors come back as
//! `HintError` values and are turned into a status by the interpreter.

use std::path::Path;

use hintd_types::backend::MediaPlayer;
use hintd_types::error::{HintError, Result};

use crate::interpreter::{Command, CommandTable};
use crate::session::Session;
use crate::tokenizer::TokenVector;

/// Register the station commands into a table.
pub fn register_builtins(table: &mut CommandTable) {
    table.register(Box::new(ShowHintCmd));
    table.register(Box::new(ShowBgCmd));
    table.register(Box::new(PlayMediaCmd));
    table.register(Box::new(ExitCmd));
}

/// Switch the player to `path`.
fn show(player: &mut dyn MediaPlayer, path: &Path) -> Result<()> {
    player.pause()?;
    player.set_media(path)?;
    player.play()
}

fn required_arg<'a>(argv: &'a TokenVector, usage: &str) -> Result<&'a str> {
    argv.get(1)
        .ok_or_else(|| HintError::Command(format!("usage: {usage}")))
}

// ---------------------------------------------------------------------------
// showhint
// ---------------------------------------------------------------------------

struct ShowHintCmd;
impl Command for ShowHintCmd {
    fn name(&self) -> &str {
        "showhint"
    }
    fn description(&self) -> &str {
        "Render a caption over the hint background and show it"
    }
    fn usage(&self) -> &str {
        "showhint HINT"
    }
    fn execute(&self, argv: &TokenVector, session: &mut Session<'_>) -> Result<()> {
        let hint = required_arg(argv, self.usage())?;
        let background = session.media.hint_background_path();
        let output = session.next_caption_path();
        session.captioner.render_caption(&background, hint, &output)?;
        log::info!("showing hint {hint:?} from {}", output.display());
        show(session.player, &output)
    }
}

// ---------------------------------------------------------------------------
// showbg
// ---------------------------------------------------------------------------

struct ShowBgCmd;
impl Command for ShowBgCmd {
    fn name(&self) -> &str {
        "showbg"
    }
    fn description(&self) -> &str {
        "Show the background image"
    }
    fn usage(&self) -> &str {
        "showbg"
    }
    fn execute(&self, _argv: &TokenVector, session: &mut Session<'_>) -> Result<()> {
        let path = session.media.background_path();
        log::info!("showing background {}", path.display());
        show(session.player, &path)
    }
}

// ---------------------------------------------------------------------------
// playmedia
// ---------------------------------------------------------------------------

struct PlayMediaCmd;
impl Command for PlayMediaCmd {
    fn name(&self) -> &str {
        "playmedia"
    }
    fn description(&self) -> &str {
        "Play a file from the media directory"
    }
    fn usage(&self) -> &str {
        "playmedia MEDIA"
    }
    fn execute(&self, argv: &TokenVector, session: &mut Session<'_>) -> Result<()> {
        let name = required_arg(argv, self.usage())?;
        let path = session.media.resolve(name);
        log::info!("playing {}", path.display());
        show(session.player, &path)
    }
}

// ---------------------------------------------------------------------------
// exit
// ---------------------------------------------------------------------------

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn description(&self) -> &str {
        "Stop the station"
    }
    fn usage(&self) -> &str {
        "exit"
    }
    fn execute(&self, _argv: &TokenVector, session: &mut Session<'_>) -> Result<()> {
        log::info!("Bye!");
        session.shutdown.request(0);
        Ok(())
    }
}
