//! Parser error types and helpers

use core_types::{ErrorKind, ScriptError, SourceLocation};
use thiserror::Error;

/// A syntax error at a line of the parsed source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line})")]
pub struct SyntaxError {
    /// What went wrong
    pub message: String,
    /// 1-based line relative to the parsed source
    pub line: u32,
}

impl SyntaxError {
    /// Converts into a script error for source evaluated from `filename`
    /// starting at `base_line`.
    pub fn into_script_error(self, filename: &str, base_line: u32) -> ScriptError {
        ScriptError::new(
            ErrorKind::SyntaxError,
            self.message,
            SourceLocation::new(filename, base_line.saturating_add(self.line).saturating_sub(1)),
        )
    }
}

/// Result type for lexing and parsing
pub type ParseResult<T> = Result<T, SyntaxError>;

/// Create a syntax error at a given line
pub fn syntax_error(message: impl Into<String>, line: u32) -> SyntaxError {
    SyntaxError {
        message: message.into(),
        line,
    }
}

/// Create an unexpected token error
pub fn unexpected_token(expected: &str, got: &str, line: u32) -> SyntaxError {
    syntax_error(format!("Expected {}, got {}", expected, got), line)
}
