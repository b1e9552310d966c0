//! Socket-level tests for the receive loop.

use std::net::{SocketAddr, UdpSocket};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use hintd_shell::test_utils::{RecordingCaptioner, RecordingCommand, RecordingPlayer, media_paths};
use hintd_shell::{
    Command, CommandTable, Interpreter, Session, TokenVector, command_queue, register_builtins,
};
use hintd_types::shutdown::ShutdownSignal;

use super::*;

fn loopback_config(buffer_size: usize) -> ListenerConfig {
    ListenerConfig {
        bind: "127.0.0.1".to_string(),
        port: 0,
        buffer_size,
        poll_interval: Duration::from_millis(20),
    }
}

fn client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").unwrap()
}

/// Start a receiver on its own thread that forwards every line to a channel.
fn spawn_collector(
    buffer_size: usize,
    shutdown: &ShutdownSignal,
) -> (SocketAddr, mpsc::Receiver<String>, JoinHandle<ReceiveStats>) {
    let mut receiver = ReceiveLoop::new(loopback_config(buffer_size));
    let addr = receiver.bind().unwrap();
    let (tx, rx) = mpsc::channel();
    let shutdown = shutdown.clone();
    let handle = std::thread::spawn(move || {
        let mut sink = |line: &str| {
            let _ = tx.send(line.to_string());
        };
        receiver.run(&mut sink, &shutdown).unwrap();
        receiver.stats()
    });
    (addr, rx, handle)
}

fn collect(rx: &mpsc::Receiver<String>, want: usize) -> Vec<String> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut lines = Vec::new();
    while lines.len() < want && Instant::now() < deadline {
        if let Ok(line) = rx.recv_timeout(Duration::from_millis(50)) {
            lines.push(line);
        }
    }
    lines
}

#[test]
fn bind_reports_ephemeral_port() {
    let mut receiver = ReceiveLoop::new(loopback_config(1024));
    let addr = receiver.bind().unwrap();
    assert!(receiver.is_listening());
    assert_ne!(addr.port(), 0);
    assert_eq!(receiver.local_addr(), Some(addr));
    receiver.stop();
    assert!(!receiver.is_listening());
}

#[test]
fn bind_conflict_is_net_error() {
    let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();
    let mut receiver = ReceiveLoop::new(ListenerConfig {
        port,
        ..loopback_config(1024)
    });
    let err = receiver.bind().unwrap_err();
    assert!(format!("{err}").contains("cannot bind"));
}

#[test]
fn idle_poll_returns_false() {
    let mut receiver = ReceiveLoop::new(loopback_config(1024));
    receiver.bind().unwrap();
    let mut lines: Vec<String> = Vec::new();
    let mut sink = |line: &str| lines.push(line.to_string());
    assert!(!receiver.receive_once(&mut sink).unwrap());
    assert!(lines.is_empty());
}

#[test]
fn every_datagram_in_a_burst_is_observed() {
    const N: usize = 50;
    let shutdown = ShutdownSignal::new();
    let (addr, rx, handle) = spawn_collector(1024, &shutdown);

    let sender = client();
    for i in 0..N {
        sender.send_to(format!("noop {i}").as_bytes(), addr).unwrap();
    }

    let lines = collect(&rx, N);
    shutdown.request(0);
    let stats = handle.join().unwrap();

    let expected: Vec<String> = (0..N).map(|i| format!("noop {i}")).collect();
    assert_eq!(lines, expected);
    assert_eq!(stats.delivered, N as u64);
}

#[test]
fn full_buffer_payload_is_rejected() {
    let shutdown = ShutdownSignal::new();
    let (addr, rx, handle) = spawn_collector(64, &shutdown);
    let sender = client();

    // Valid command padded to exactly the buffer capacity.
    let mut exact = b"showbg".to_vec();
    exact.resize(64, b' ');
    sender.send_to(&exact, addr).unwrap();

    // Larger than the buffer: cut by the transport, also rejected.
    let mut oversized = b"showbg".to_vec();
    oversized.resize(200, b' ');
    sender.send_to(&oversized, addr).unwrap();

    // One byte below capacity is accepted.
    let mut fits = b"showbg".to_vec();
    fits.resize(63, b' ');
    sender.send_to(&fits, addr).unwrap();

    let lines = collect(&rx, 1);
    shutdown.request(0);
    let stats = handle.join().unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].trim_end(), "showbg");
    assert_eq!(stats.truncated, 2);
    assert_eq!(stats.received, 3);
}

#[test]
fn undecodable_payload_does_not_stop_the_loop() {
    let shutdown = ShutdownSignal::new();
    let (addr, rx, handle) = spawn_collector(1024, &shutdown);
    let sender = client();

    sender.send_to(&[0xc3, 0x28, b' ', b'x'], addr).unwrap();
    sender.send_to(b"showbg", addr).unwrap();

    let lines = collect(&rx, 1);
    shutdown.request(0);
    let stats = handle.join().unwrap();

    assert_eq!(lines, vec!["showbg".to_string()]);
    assert_eq!(stats.decode_failures, 1);
}

#[test]
fn shutdown_stops_an_idle_loop() {
    let shutdown = ShutdownSignal::new();
    let (_addr, _rx, handle) = spawn_collector(1024, &shutdown);
    std::thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    shutdown.request(0);
    handle.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(2));
}

// ---------------------------------------------------------------------------
// Receiver + dispatcher + worker
// ---------------------------------------------------------------------------

struct Station {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    reactor: JoinHandle<()>,
    worker: JoinHandle<()>,
}

fn spawn_station(extra: Vec<Box<dyn Command>>, player: &RecordingPlayer) -> Station {
    let mut table = CommandTable::new();
    register_builtins(&mut table);
    for cmd in extra {
        table.register(cmd);
    }
    let interpreter = Arc::new(Interpreter::new(table, 16));
    let shutdown = ShutdownSignal::new();
    let (dispatcher, worker) = command_queue(interpreter, shutdown.clone());

    let mut worker_player = player.clone();
    let worker_shutdown = shutdown.clone();
    let worker_thread = std::thread::spawn(move || {
        let captioner = RecordingCaptioner::default();
        let mut session = Session::new(
            media_paths("/media/"),
            &mut worker_player,
            &captioner,
            worker_shutdown,
            2,
        );
        worker
            .with_poll_interval(Duration::from_millis(10))
            .run(&mut session);
    });

    let mut receiver = ReceiveLoop::new(loopback_config(1024));
    let addr = receiver.bind().unwrap();
    let reactor_shutdown = shutdown.clone();
    let reactor = std::thread::spawn(move || {
        let mut sink = |line: &str| {
            dispatcher.submit(line);
        };
        receiver.run(&mut sink, &reactor_shutdown).unwrap();
    });

    Station {
        addr,
        shutdown,
        reactor,
        worker: worker_thread,
    }
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn burst_of_commands_all_reach_the_handler() {
    const N: usize = 30;
    let rec = RecordingCommand::new("noop");
    let player = RecordingPlayer::default();
    let station = spawn_station(vec![Box::new(rec.clone()) as Box<dyn Command>], &player);

    let sender = client();
    for i in 0..N {
        sender.send_to(format!("noop {i}").as_bytes(), station.addr).unwrap();
    }
    assert!(wait_for(|| rec.invocations().len() == N));

    station.shutdown.request(0);
    station.reactor.join().unwrap();
    station.worker.join().unwrap();

    let seen: Vec<String> = rec.invocations().into_iter().map(|argv| argv[1].clone()).collect();
    let expected: Vec<String> = (0..N).map(|i| i.to_string()).collect();
    assert_eq!(seen, expected);
}

#[test]
fn exit_stops_station_and_ignores_later_datagrams() {
    let player = RecordingPlayer::default();
    let station = spawn_station(Vec::new(), &player);
    let sender = client();

    sender.send_to(b"showbg", station.addr).unwrap();
    sender.send_to(b"foobar", station.addr).unwrap();
    sender.send_to(b"exit", station.addr).unwrap();
    sender.send_to(b"playmedia late.mp4", station.addr).unwrap();

    station.reactor.join().unwrap();
    station.worker.join().unwrap();
    assert!(station.shutdown.is_requested());
    assert_eq!(station.shutdown.exit_status(), 0);

    // Sent after the station stopped: no effect.
    sender.send_to(b"playmedia later.mp4", station.addr).unwrap();
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(player.media(), vec![PathBuf::from("/media/bg.jpg")]);
}

#[test]
fn malformed_commands_do_not_block_good_ones() {
    let player = RecordingPlayer::default();
    let station = spawn_station(Vec::new(), &player);
    let sender = client();

    sender.send_to(b"showhint \"Good job!", station.addr).unwrap();
    sender.send_to(b"showhint bad\\q", station.addr).unwrap();
    sender.send_to(b"\n", station.addr).unwrap();
    sender.send_to(b"playmedia intro.mp4\n", station.addr).unwrap();

    assert!(wait_for(|| !player.media().is_empty()));
    station.shutdown.request(0);
    station.reactor.join().unwrap();
    station.worker.join().unwrap();

    assert_eq!(player.media(), vec![PathBuf::from("/media/intro.mp4")]);
}

struct PanickingCmd;
impl Command for PanickingCmd {
    fn name(&self) -> &str {
        "boom"
    }
    fn description(&self) -> &str {
        "Panic inside the handler"
    }
    fn usage(&self) -> &str {
        "boom"
    }
    fn execute(
        &self,
        _argv: &TokenVector,
        _session: &mut Session<'_>,
    ) -> hintd_types::error::Result<()> {
        panic!("handler bug");
    }
}

#[test]
fn handler_panic_stops_station_with_failure() {
    let player = RecordingPlayer::default();
    let station = spawn_station(vec![Box::new(PanickingCmd) as Box<dyn Command>], &player);
    let sender = client();

    sender.send_to(b"boom", station.addr).unwrap();

    assert!(wait_for(|| station.reactor.is_finished()));
    station.reactor.join().unwrap();
    assert!(station.worker.join().is_err());
    assert!(station.shutdown.is_requested());
    assert_eq!(station.shutdown.exit_status(), 1);
}
