//! Media player backed by an external program.
//!
//! Each `play` starts `<program> <args...> <media>` as a child process and
//! `pause` stops it. A child that exits on its own with a failure status is
//! reported as a fatal playback error through `check`.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use hintd_types::backend::MediaPlayer;
use hintd_types::config::PlayerSection;
use hintd_types::error::{HintError, Result};

pub struct ProcessPlayer {
    program: String,
    args: Vec<String>,
    media: Option<PathBuf>,
    child: Option<Child>,
}

impl ProcessPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            media: None,
            child: None,
        }
    }

    pub fn from_config(section: &PlayerSection) -> Self {
        Self::new(section.program.clone(), section.args.clone())
    }

    /// Whether a player process is currently running.
    pub fn is_playing(&self) -> bool {
        self.child.is_some()
    }

    /// Media selected by the last `set_media`.
    pub fn media(&self) -> Option<&Path> {
        self.media.as_deref()
    }

    fn command(&self, media: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(media)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        // The child may already have exited; kill then fails harmlessly.
        if let Err(e) = child.kill() {
            log::debug!("player kill: {e}");
        }
        child
            .wait()
            .map_err(|e| HintError::Player(format!("cannot reap {}: {e}", self.program)))?;
        log::debug!("player process {} stopped", child.id());
        Ok(())
    }
}

impl MediaPlayer for ProcessPlayer {
    fn pause(&mut self) -> Result<()> {
        self.stop()
    }

    fn set_media(&mut self, path: &Path) -> Result<()> {
        self.media = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let media = self
            .media
            .clone()
            .ok_or_else(|| HintError::Player("no media selected".to_string()))?;
        self.stop()?;
        let child = self.command(&media).spawn().map_err(|e| {
            HintError::Player(format!("cannot start {}: {e}", self.program))
        })?;
        log::debug!(
            "started {} (pid {}) for {}",
            self.program,
            child.id(),
            media.display()
        );
        self.child = Some(child);
        Ok(())
    }

    fn check(&mut self) -> Result<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        match child.try_wait() {
            Ok(None) => Ok(()),
            Ok(Some(status)) => {
                self.child = None;
                if status.success() {
                    log::debug!("{} finished", self.program);
                    Ok(())
                } else {
                    Err(HintError::Player(format!(
                        "{} exited with {status}",
                        self.program
                    )))
                }
            },
            Err(e) => {
                self.child = None;
                Err(HintError::Player(format!(
                    "cannot poll {}: {e}",
                    self.program
                )))
            },
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.stop()
    }
}

impl Drop for ProcessPlayer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("{e}");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait_for_exit(player: &mut ProcessPlayer) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while player.is_playing() && Instant::now() < deadline {
            player.check()?;
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }

    #[test]
    fn from_config_uses_section() {
        let player = ProcessPlayer::from_config(&PlayerSection::default());
        assert_eq!(player.program, "cvlc");
        assert!(player.args.contains(&"--fullscreen".to_string()));
        assert!(!player.is_playing());
        assert!(player.media().is_none());
    }

    #[test]
    fn media_path_is_last_argument() {
        let player = ProcessPlayer::new("cvlc", vec!["--quiet".to_string()]);
        let cmd = player.command(Path::new("/m/bg.jpg"));
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["--quiet", "/m/bg.jpg"]);
    }

    #[test]
    fn play_without_media_fails() {
        let mut player = ProcessPlayer::new("true", Vec::new());
        assert!(matches!(player.play(), Err(HintError::Player(_))));
    }

    #[test]
    fn missing_program_fails_to_play() {
        let mut player = ProcessPlayer::new("/nonexistent/hintd-player", Vec::new());
        player.set_media(Path::new("/m/bg.jpg")).unwrap();
        let err = player.play().unwrap_err();
        assert!(err.to_string().contains("cannot start"));
        assert!(!player.is_playing());
    }

    #[test]
    fn clean_exit_is_not_an_error() {
        let mut player = ProcessPlayer::new("true", Vec::new());
        player.set_media(Path::new("/m/bg.jpg")).unwrap();
        player.play().unwrap();
        wait_for_exit(&mut player).unwrap();
        assert!(!player.is_playing());
    }

    #[test]
    fn failing_exit_is_reported_once() {
        let mut player = ProcessPlayer::new("false", Vec::new());
        player.set_media(Path::new("/m/bg.jpg")).unwrap();
        player.play().unwrap();
        let err = wait_for_exit(&mut player).unwrap_err();
        assert!(matches!(err, HintError::Player(_)));
        assert!(player.check().is_ok());
    }

    #[test]
    fn pause_stops_running_child() {
        let args = vec!["-c".to_string(), "sleep 5".to_string(), "sh".to_string()];
        let mut player = ProcessPlayer::new("sh", args);
        player.set_media(Path::new("/m/clip.mp4")).unwrap();
        player.play().unwrap();
        assert!(player.is_playing());

        let start = Instant::now();
        player.pause().unwrap();
        assert!(!player.is_playing());
        assert!(start.elapsed() < Duration::from_secs(2));
        // A killed child is not a playback failure.
        assert!(player.check().is_ok());
    }

    #[test]
    fn play_replaces_running_child() {
        let args = vec!["-c".to_string(), "sleep 5".to_string(), "sh".to_string()];
        let mut player = ProcessPlayer::new("sh", args);
        player.set_media(Path::new("/m/a.mp4")).unwrap();
        player.play().unwrap();
        player.set_media(Path::new("/m/b.mp4")).unwrap();
        player.play().unwrap();
        assert_eq!(player.media(), Some(Path::new("/m/b.mp4")));
        player.shutdown().unwrap();
        assert!(!player.is_playing());
    }
}
