//! Command-line flags.
//!
//! `-h` selects the hint background, so clap's generated `-h` help flag is
//! turned off and help lives on `-?`/`--help`.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use hintd_types::config::StationConfig;
use hintd_types::error::Result;

#[derive(Debug, Parser)]
#[command(name = "hintd")]
#[command(version, about = "Remote-controlled hint and media display station")]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// UDP port to listen on
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Directory holding backgrounds and media files (default: $HOME/Media/)
    #[arg(short, long, value_name = "DIR")]
    pub mediadir: Option<String>,

    /// Background image shown between hints
    #[arg(short, long, value_name = "FILE")]
    pub background: Option<String>,

    /// Background image hints are drawn on
    #[arg(short = 'h', long = "hint-background", value_name = "FILE")]
    pub hint_background: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local address to bind the listener to
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Print help
    #[arg(short = '?', long, action = ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,
}

impl Cli {
    /// Build the station configuration: defaults, then the config file,
    /// then flags.
    pub fn station_config(&self) -> Result<StationConfig> {
        let mut config = match &self.config {
            Some(path) => StationConfig::load(path)?,
            None => StationConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Override `config` with every flag that was given.
    pub fn apply(&self, config: &mut StationConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(bind) = &self.bind {
            config.listener.bind = bind.clone();
        }
        if let Some(dir) = &self.mediadir {
            config.media.dir = Some(dir.clone());
        }
        if let Some(background) = &self.background {
            config.media.background = background.clone();
        }
        if let Some(hint_background) = &self.hint_background {
            config.media.hint_background = hint_background.clone();
        }
    }
}

/// Exit status for a flag parsing outcome: 0 for help and version output,
/// 1 for anything malformed.
pub fn parse_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() { 1 } else { 0 }
}
