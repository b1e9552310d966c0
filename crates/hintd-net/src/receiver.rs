//! UDP command receiver.
//!
//! One socket, one reusable buffer, one datagram at a time. Each payload is
//! checked for truncation, decoded as UTF-8 up to the first NUL, and handed
//! to a [`LineSink`]. Nothing is ever sent back to the peer.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use hintd_types::config::{DEFAULT_BUFFER_SIZE, DEFAULT_PORT, ListenerSection};
use hintd_types::error::{HintError, Result};
use hintd_types::shutdown::ShutdownSignal;

/// Configuration for the command receiver.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Local address to bind.
    pub bind: String,
    /// Port to listen on (0 = pick an ephemeral port).
    pub port: u16,
    /// Receive buffer capacity. A datagram that fills it is rejected.
    pub buffer_size: usize,
    /// Receive timeout between shutdown checks.
    pub poll_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl From<&ListenerSection> for ListenerConfig {
    fn from(section: &ListenerSection) -> Self {
        Self {
            bind: section.bind.clone(),
            port: section.port,
            buffer_size: section.buffer_size,
            poll_interval: Duration::from_millis(section.poll_interval_ms),
        }
    }
}

/// Why a datagram was not passed on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatagramError {
    #[error("the command is larger than {} bytes and can not be interpreted", .capacity - 1)]
    Truncated { capacity: usize },

    #[error("invalid byte sequence in command, it cannot be interpreted: {0}")]
    Decode(#[from] std::str::Utf8Error),
}

/// Decode the first `received` bytes of `buffer` into a command line.
///
/// A datagram that filled the whole buffer may have been cut short by the
/// transport and is rejected regardless of content. Text ends at the first
/// NUL byte.
pub fn decode_datagram(buffer: &[u8], received: usize) -> std::result::Result<&str, DatagramError> {
    if received >= buffer.len() {
        return Err(DatagramError::Truncated {
            capacity: buffer.len(),
        });
    }
    let payload = &buffer[..received];
    let end = payload.iter().position(|&b| b == 0).unwrap_or(received);
    Ok(std::str::from_utf8(&payload[..end])?)
}

/// Receives decoded command lines.
pub trait LineSink {
    fn deliver(&mut self, line: &str);
}

impl<F: FnMut(&str)> LineSink for F {
    fn deliver(&mut self, line: &str) {
        self(line)
    }
}

/// Counters kept by the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Datagrams taken off the socket.
    pub received: u64,
    /// Lines passed to the sink.
    pub delivered: u64,
    /// Datagrams rejected as truncated.
    pub truncated: u64,
    /// Datagrams rejected as undecodable.
    pub decode_failures: u64,
}

/// Single-socket command receiver.
///
/// Call [`ReceiveLoop::bind`], then [`ReceiveLoop::run`] on the thread that
/// owns the socket.
pub struct ReceiveLoop {
    config: ListenerConfig,
    socket: Option<UdpSocket>,
    buffer: Vec<u8>,
    stats: ReceiveStats,
}

impl ReceiveLoop {
    /// Create a receiver. The buffer is allocated once here and reused.
    pub fn new(config: ListenerConfig) -> Self {
        let buffer = vec![0u8; config.buffer_size.max(2)];
        Self {
            config,
            socket: None,
            buffer,
            stats: ReceiveStats::default(),
        }
    }

    /// Bind the configured endpoint. Returns the bound address.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let endpoint = (self.config.bind.as_str(), self.config.port);
        let socket = UdpSocket::bind(endpoint).map_err(|e| {
            HintError::Net(format!(
                "cannot bind {}:{}: {e}",
                self.config.bind, self.config.port
            ))
        })?;
        let poll = self.config.poll_interval.max(Duration::from_millis(1));
        socket.set_read_timeout(Some(poll))?;
        let addr = socket.local_addr()?;
        self.socket = Some(socket);
        log::info!("listening for commands on udp://{addr}");
        Ok(addr)
    }

    /// Whether the socket is bound.
    pub fn is_listening(&self) -> bool {
        self.socket.is_some()
    }

    /// Address of the bound socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> ReceiveStats {
        self.stats
    }

    /// Receive and handle datagrams until `shutdown` is requested.
    ///
    /// Rejected datagrams are logged and skipped. Only socket failures other
    /// than timeouts end the loop early.
    pub fn run(&mut self, sink: &mut dyn LineSink, shutdown: &ShutdownSignal) -> Result<()> {
        while !shutdown.is_requested() {
            self.receive_once(sink)?;
        }
        log::info!("receive loop stopped");
        Ok(())
    }

    /// Wait up to one poll interval for a datagram and handle it.
    ///
    /// Returns `true` if a datagram was taken off the socket.
    pub fn receive_once(&mut self, sink: &mut dyn LineSink) -> Result<bool> {
        let Some(socket) = self.socket.as_ref() else {
            return Err(HintError::Net("receiver is not bound".to_string()));
        };

        let (received, peer) = match socket.recv_from(&mut self.buffer) {
            Ok(r) => r,
            Err(e) if is_idle(&e) => return Ok(false),
            Err(e) if is_oversized(&e) => {
                self.stats.received += 1;
                self.stats.truncated += 1;
                let err = DatagramError::Truncated {
                    capacity: self.buffer.len(),
                };
                log::warn!("{err}");
                return Ok(true);
            },
            Err(e) if is_transient(&e) => {
                log::warn!("receive error: {e}");
                return Ok(false);
            },
            Err(e) => return Err(HintError::Net(format!("receive failed: {e}"))),
        };

        self.stats.received += 1;
        log::debug!("received {received} bytes from {peer}");

        match decode_datagram(&self.buffer, received) {
            Ok(line) => {
                log::info!("received command: {line:?}");
                self.stats.delivered += 1;
                sink.deliver(line);
            },
            Err(e @ DatagramError::Truncated { .. }) => {
                self.stats.truncated += 1;
                log::warn!("{e} (from {peer})");
            },
            Err(e @ DatagramError::Decode(_)) => {
                self.stats.decode_failures += 1;
                log::warn!("{e} (from {peer})");
            },
        }
        Ok(true)
    }

    /// Close the socket.
    pub fn stop(&mut self) {
        self.socket = None;
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

/// `WSAEMSGSIZE`: Windows fails the receive instead of truncating silently
/// when a datagram is larger than the buffer.
const WSAEMSGSIZE: i32 = 10040;

fn is_oversized(e: &io::Error) -> bool {
    e.raw_os_error() == Some(WSAEMSGSIZE)
}

// ICMP errors from earlier sends can surface on a UDP socket's next receive.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    )
}
