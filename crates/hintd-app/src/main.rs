//! hintd entry point.
//!
//! Listens for command lines on a UDP port and drives an external media
//! player: show a background, show a captioned hint, play a media file, or
//! exit. The calling thread runs the receive loop; a worker thread owns the
//! player and runs commands in arrival order.

mod cli;

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, parse_exit_code};
use hintd_backend::{MagickCaptioner, ProcessPlayer};
use hintd_net::{ListenerConfig, ReceiveLoop};
use hintd_shell::{CommandTable, Interpreter, MediaPaths, Session, command_queue, register_builtins};
use hintd_types::backend::MediaPlayer;
use hintd_types::shutdown::ShutdownSignal;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(parse_exit_code(&e));
        },
    };

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            1
        },
    };
    std::process::exit(code);
}

/// Start the station and block until it stops. Returns the exit status.
fn run(cli: &Cli) -> Result<i32> {
    let config = cli.station_config()?;
    let home = std::env::var_os("HOME");
    let media = MediaPaths {
        dir: config.media_dir(home.as_deref())?,
        background: config.media.background.clone(),
        hint_background: config.media.hint_background.clone(),
    };
    log::info!("media directory: {}", media.dir);
    log::info!("background: {}", media.background_path().display());
    log::info!("hint background: {}", media.hint_background_path().display());

    let mut table = CommandTable::new();
    register_builtins(&mut table);
    let interpreter = Arc::new(Interpreter::new(table, config.listener.max_tokens));
    let shutdown = ShutdownSignal::new();

    let mut receiver = ReceiveLoop::new(ListenerConfig::from(&config.listener));
    receiver.bind()?;

    let (dispatcher, worker) = command_queue(Arc::clone(&interpreter), shutdown.clone());
    let worker_thread = {
        let shutdown = shutdown.clone();
        let player_section = config.player.clone();
        let captioner_section = config.captioner.clone();
        let caption_slots = config.media.caption_slots;
        thread::Builder::new()
            .name("hintd-worker".to_string())
            .spawn(move || {
                let _guard = shutdown.panic_guard();
                let mut player = ProcessPlayer::from_config(&player_section);
                let captioner = MagickCaptioner::from_config(&captioner_section);
                let mut session =
                    Session::new(media, &mut player, &captioner, shutdown, caption_slots);

                // Commands received meanwhile wait in the queue behind this.
                let status = interpreter.interpret("showbg", &mut session);
                if !status.is_ok() {
                    log::warn!("could not show the background at startup ({status})");
                }

                worker.run(&mut session);
                if let Err(e) = player.shutdown() {
                    log::warn!("{e}");
                }
            })
            .context("cannot start worker thread")?
    };

    let mut sink = |line: &str| {
        dispatcher.submit(line);
    };
    if let Err(e) = receiver.run(&mut sink, &shutdown) {
        log::error!("{e}");
        shutdown.request(1);
    }
    receiver.stop();
    drop(dispatcher);

    if worker_thread.join().is_err() {
        log::error!("unexpected error: worker thread panicked");
        return Ok(1);
    }
    Ok(shutdown.exit_status())
}
