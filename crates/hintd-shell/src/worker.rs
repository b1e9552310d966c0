//! Command queue between the receive loop and the handler thread.
//!
//! The receive loop only tokenizes and resolves lines through a
//! [`Dispatcher`]; resolved invocations go onto a FIFO channel that a single
//! [`Worker`] drains. One consumer keeps commands in arrival order.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use hintd_types::shutdown::ShutdownSignal;

use crate::interpreter::{Interpreter, Invocation, Prepared, StatusCode};
use crate::session::Session;

/// How long the worker waits for a command before checking the player and
/// the shutdown flag again.
pub const DEFAULT_WORKER_POLL: Duration = Duration::from_millis(100);

/// What happened to a submitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Queued for the worker.
    Queued,
    /// Finished on the spot (blank, malformed, unknown, or worker gone).
    Finished(StatusCode),
}

/// Create a connected dispatcher/worker pair.
pub fn command_queue(
    interpreter: Arc<Interpreter>,
    shutdown: ShutdownSignal,
) -> (Dispatcher, Worker) {
    let (tx, rx) = mpsc::channel();
    let dispatcher = Dispatcher {
        interpreter: Arc::clone(&interpreter),
        queue: tx,
        shutdown: shutdown.clone(),
    };
    let worker = Worker {
        interpreter,
        queue: rx,
        shutdown,
        poll: DEFAULT_WORKER_POLL,
    };
    (dispatcher, worker)
}

/// Producer side, used by the receive loop.
pub struct Dispatcher {
    interpreter: Arc<Interpreter>,
    queue: Sender<Invocation>,
    shutdown: ShutdownSignal,
}

impl Dispatcher {
    /// Tokenize and resolve `line`, queueing it if a handler should run.
    ///
    /// A worker that is gone can never run another command, so finding the
    /// queue closed requests shutdown with status 1.
    pub fn submit(&self, line: &str) -> Submission {
        match self.interpreter.prepare(line) {
            Prepared::Done(status) => Submission::Finished(status),
            Prepared::Dispatch(invocation) => match self.queue.send(invocation) {
                Ok(()) => Submission::Queued,
                Err(mpsc::SendError(invocation)) => {
                    log::error!("worker stopped, dropping '{}'", invocation.name());
                    self.shutdown.request(1);
                    Submission::Finished(StatusCode::Handler(1))
                },
            },
        }
    }
}

/// Consumer side: runs handlers one at a time.
pub struct Worker {
    interpreter: Arc<Interpreter>,
    queue: Receiver<Invocation>,
    shutdown: ShutdownSignal,
    poll: Duration,
}

impl Worker {
    /// Override the idle poll interval.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Run queued invocations until shutdown is requested or every
    /// dispatcher has been dropped.
    ///
    /// A fatal player error or a panicking handler requests shutdown with
    /// exit status 1. Commands still queued when shutdown is requested are
    /// discarded.
    pub fn run(self, session: &mut Session<'_>) {
        let _guard = self.shutdown.panic_guard();
        log::debug!("worker started");
        while !self.shutdown.is_requested() {
            match self.queue.recv_timeout(self.poll) {
                Ok(invocation) => {
                    let status = self.interpreter.execute(&invocation, session);
                    log::debug!("'{}' finished with {status}", invocation.name());
                },
                Err(RecvTimeoutError::Timeout) => {},
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Err(e) = session.player.check() {
                log::error!("player encountered an error, terminating: {e}");
                self.shutdown.request(1);
            }
        }

        let dropped = self.queue.try_iter().count();
        if dropped > 0 {
            log::info!("discarding {dropped} queued command(s) after shutdown");
        }
        log::debug!("worker stopped");
    }
}
