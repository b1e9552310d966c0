//! Shell-like tokenizer for untrusted command lines.
//!
//! Whitespace separates tokens, `"` toggles quoting (whitespace inside quotes
//! is literal), and `\` escapes exactly one following character from a fixed
//! set. The result is all-or-nothing: any malformed input rejects the whole
//! line and no partial vector is produced.

use std::fmt;

/// Quote character. Toggles in-quote mode.
pub const QUOTE: char = '"';

/// Escape character.
pub const ESCAPE: char = '\\';

/// Why a line could not be tokenized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("max number of {max} tokens exceeded")]
    TooManyTokens { max: usize },

    #[error("unclosed quotation mark")]
    InvalidQuote,

    #[error("invalid escape sequence ({})", describe_escape(.found))]
    InvalidEscape {
        /// Character after the backslash, `None` at end of input.
        found: Option<char>,
    },
}

fn describe_escape(found: &Option<char>) -> String {
    match found {
        Some(c) => format!("\\{}", c.escape_debug()),
        None => "trailing backslash".to_string(),
    }
}

/// Characters that may follow a backslash.
pub fn is_escapable(c: char) -> bool {
    c == QUOTE || c == ESCAPE || c.is_whitespace()
}

/// Ordered, bounded sequence of tokens from one command line.
///
/// Token 0, if present, is the command name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenVector {
    tokens: Vec<String>,
}

impl TokenVector {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// The command name (token 0).
    pub fn command_name(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

impl fmt::Display for TokenVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{token:?}")?;
        }
        write!(f, "]")
    }
}

/// Tokenize `input` into at most `max_tokens` tokens.
///
/// - Runs of unquoted whitespace separate tokens.
/// - `"` toggles quoting anywhere in a token, so `a"b c"d` is one token
///   `ab cd`, and `""` is one empty token.
/// - `\` followed by `"`, `\` or a whitespace character yields that
///   character literally, inside or outside quotes. Any other character, or
///   end of input, is [`ParseError::InvalidEscape`].
/// - Opening token number `max_tokens + 1` fails immediately with
///   [`ParseError::TooManyTokens`], before the rest of the line is read.
/// - End of input inside quotes is [`ParseError::InvalidQuote`].
///
/// Errors are reported in scan order: the first problem encountered wins.
pub fn tokenize(input: &str, max_tokens: usize) -> Result<TokenVector, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut open = false;
    let mut in_quote = false;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if !in_quote && ch.is_whitespace() {
            if open {
                tokens.push(std::mem::take(&mut current));
                open = false;
            }
            continue;
        }

        if !open {
            if tokens.len() == max_tokens {
                return Err(ParseError::TooManyTokens { max: max_tokens });
            }
            open = true;
        }

        match ch {
            ESCAPE => match chars.next() {
                Some(next) if is_escapable(next) => current.push(next),
                found => return Err(ParseError::InvalidEscape { found }),
            },
            QUOTE => in_quote = !in_quote,
            _ => current.push(ch),
        }
    }

    if in_quote {
        return Err(ParseError::InvalidQuote);
    }
    if open {
        tokens.push(current);
    }

    Ok(TokenVector { tokens })
}
