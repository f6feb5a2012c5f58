//! Parser Types and Limits
//!
//! Shared types and resource limits used across the parser modules.

use thiserror::Error;

/// Maximum input size accepted by the parser.
pub const MAX_INPUT_SIZE: usize = 10_000_000;
/// Maximum number of tokens in one parse.
pub const MAX_TOKENS: usize = 200_000;
/// Maximum recursion depth for nested constructs.
pub const MAX_PARSE_DEPTH: usize = 200;

/// Parser mode selection. The AST shape does not vary across modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserMode {
    /// Full bash-compatible grammar.
    #[default]
    Bash,
    /// Rejects the bash-only forms ([[ ]], (( )), function keyword, select).
    Posix,
    /// Collects errors instead of aborting at the first one.
    Permissive,
}

/// A lexing or parsing failure, carrying the offending position.
#[derive(Debug, Clone, Error)]
#[error("syntax error at line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// True when the input ended inside an unterminated construct; the
    /// interactive loop keeps reading with PS2 instead of reporting.
    pub incomplete: bool,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: false,
        }
    }

    pub fn incomplete(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            incomplete: true,
        }
    }
}
