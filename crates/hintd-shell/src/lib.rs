//! Command channel core.
//!
//! A line of untrusted text is tokenized into a bounded argument vector,
//! token 0 is looked up in an immutable command table, and the matching
//! handler runs against an explicit [`Session`]. The receive loop only
//! tokenizes and resolves; handlers run on a separate worker fed through a
//! FIFO queue.

mod commands;
mod interpreter;
mod session;
mod tokenizer;
mod worker;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Register `showhint`, `showbg`, `playmedia` and `exit` into a table.
pub use commands::register_builtins;
/// A single executable command.
pub use interpreter::Command;
/// Immutable name-to-handler mapping.
pub use interpreter::CommandTable;
/// Tokenizes, resolves and runs command lines.
pub use interpreter::{Interpreter, Invocation, NOT_FOUND_CODE, Prepared, StatusCode};
/// Handler context: media paths, engines, shutdown signal.
pub use session::{MediaPaths, Session};
/// Tokenizer entry point and its types.
pub use tokenizer::{ParseError, TokenVector, tokenize};
/// Queue between the receive loop and the handler thread.
pub use worker::{DEFAULT_WORKER_POLL, Dispatcher, Submission, Worker, command_queue};
