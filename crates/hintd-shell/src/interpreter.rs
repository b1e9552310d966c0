//! Command trait, dispatch table, and the interpreter that ties the
//! tokenizer to the table.
//!
//! Interpretation is split in two so the receive loop never waits on a
//! handler: [`Interpreter::prepare`] tokenizes and resolves a line, and
//! [`Interpreter::execute`] runs the resolved handler. [`Interpreter::interpret`]
//! does both in one call.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use hintd_types::error::{HintError, Result};

use crate::session::Session;
use crate::tokenizer::{ParseError, TokenVector, tokenize};

/// Status code reported when a command name is not in the table.
pub const NOT_FOUND_CODE: i32 = 127;

/// Outcome of interpreting one command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Empty or blank input. No handler ran.
    None,
    TooManyTokens,
    InvalidQuote,
    InvalidEscape,
    /// Token 0 is not a registered command.
    NotFound,
    /// Status reported by a handler: 0 is success.
    Handler(i32),
}

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode::Handler(0);

    /// Numeric form, as a shell would report it.
    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::TooManyTokens => 2,
            Self::InvalidQuote => 3,
            Self::InvalidEscape => 4,
            Self::NotFound => NOT_FOUND_CODE,
            Self::Handler(code) => code,
        }
    }

    /// Whether nothing went wrong (blank input or handler success).
    pub fn is_ok(self) -> bool {
        matches!(self, Self::None | Self::Handler(0))
    }
}

impl From<&ParseError> for StatusCode {
    fn from(err: &ParseError) -> Self {
        match err {
            ParseError::TooManyTokens { .. } => Self::TooManyTokens,
            ParseError::InvalidQuote => Self::InvalidQuote,
            ParseError::InvalidEscape { .. } => Self::InvalidEscape,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::TooManyTokens => write!(f, "too many tokens"),
            Self::InvalidQuote => write!(f, "invalid quote"),
            Self::InvalidEscape => write!(f, "invalid escape"),
            Self::NotFound => write!(f, "not found"),
            Self::Handler(code) => write!(f, "status {code}"),
        }
    }
}

/// A single executable command.
pub trait Command: Send + Sync {
    /// The command name (token 0, matched exactly).
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Usage string (e.g. "playmedia MEDIA").
    fn usage(&self) -> &str;

    /// Run the command. `argv` includes the command name at index 0.
    fn execute(&self, argv: &TokenVector, session: &mut Session<'_>) -> Result<()>;
}

/// Mapping from command name to handler.
///
/// Filled once at startup, then moved into an [`Interpreter`] where it is
/// only read.
pub struct CommandTable {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    /// Look up a command by exact, case-sensitive name.
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All (name, description) pairs, sorted by name.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<_> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A tokenized line whose command name is known to be in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    argv: TokenVector,
}

impl Invocation {
    pub fn argv(&self) -> &TokenVector {
        &self.argv
    }

    pub fn name(&self) -> &str {
        self.argv.command_name().unwrap_or_default()
    }
}

/// Result of [`Interpreter::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Ready to hand to a handler.
    Dispatch(Invocation),
    /// Finished without running a handler.
    Done(StatusCode),
}

/// Tokenizes lines, resolves them against the command table, and runs
/// handlers. Keeps the most recent status for observers.
pub struct Interpreter {
    table: CommandTable,
    max_tokens: usize,
    last_status: Mutex<StatusCode>,
}

impl Interpreter {
    pub fn new(table: CommandTable, max_tokens: usize) -> Self {
        Self {
            table,
            max_tokens,
            last_status: Mutex::new(StatusCode::None),
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Status of the most recently finished line.
    ///
    /// Lines rejected by [`Interpreter::prepare`] finish immediately on the
    /// calling thread, while dispatched lines finish when a handler returns.
    /// With a command queue in between, this reflects completion order, not
    /// arrival order.
    pub fn last_status(&self) -> StatusCode {
        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, status: StatusCode) -> StatusCode {
        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
        status
    }

    /// Tokenize `line` and resolve its command name.
    ///
    /// Parse failures, blank input and unknown commands are reported here
    /// and recorded as the last status. The table is not consulted when
    /// tokenizing fails.
    pub fn prepare(&self, line: &str) -> Prepared {
        let argv = match tokenize(line, self.max_tokens) {
            Ok(argv) => argv,
            Err(e) => {
                log::warn!("shell: {e}");
                return Prepared::Done(self.record(StatusCode::from(&e)));
            },
        };

        let Some(name) = argv.command_name() else {
            log::debug!("shell: blank line");
            return Prepared::Done(self.record(StatusCode::None));
        };

        if self.table.get(name).is_none() {
            log::warn!("shell: command '{name}' not found");
            return Prepared::Done(self.record(StatusCode::NotFound));
        }

        Prepared::Dispatch(Invocation { argv })
    }

    /// Run a prepared invocation and record its status.
    ///
    /// Handler errors are logged and normalized to `Handler(1)`.
    pub fn execute(&self, invocation: &Invocation, session: &mut Session<'_>) -> StatusCode {
        let name = invocation.name();
        let Some(cmd) = self.table.get(name) else {
            log::warn!("shell: command '{name}' not found");
            return self.record(StatusCode::NotFound);
        };

        let status = match cmd.execute(&invocation.argv, session) {
            Ok(()) => StatusCode::SUCCESS,
            Err(HintError::Command(msg)) => {
                log::warn!("{name}: {msg}");
                StatusCode::Handler(1)
            },
            Err(e) => {
                log::error!("{name}: {e}");
                StatusCode::Handler(1)
            },
        };
        self.record(status)
    }

    /// Tokenize, resolve and run `line` synchronously.
    pub fn interpret(&self, line: &str, session: &mut Session<'_>) -> StatusCode {
        match self.prepare(line) {
            Prepared::Dispatch(invocation) => self.execute(&invocation, session),
            Prepared::Done(status) => status,
        }
    }
}
