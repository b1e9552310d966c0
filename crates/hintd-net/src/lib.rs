//! Networking: the UDP command receiver.
//!
//! The channel is one-way. Datagrams carry one command line each and no
//! reply is ever sent.

mod receiver;

pub use receiver::{
    DatagramError, LineSink, ListenerConfig, ReceiveLoop, ReceiveStats, decode_datagram,
};

#[cfg(test)]
mod tests;
