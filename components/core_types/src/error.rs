//! Error taxonomy shared by the profiler and its collaborators.
//!
//! [`ProfilerError`] is what crosses the profiler's public boundary.
//! [`ScriptError`] is what a profiling context reports when script fails.

use std::fmt;

use thiserror::Error;

use crate::SourceLocation;

/// The kind of a script-level error.
///
/// These correspond to the error constructors a profiling script can
/// observe through `e.name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value thrown by script that is not a recognised error object
    Error,
    /// Syntax error in profiling script
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an undefined variable
    ReferenceError,
    /// Value out of allowed range (including call depth)
    RangeError,
    /// Internal engine error, including out-of-memory
    InternalError,
}

impl ErrorKind {
    /// Name of the error as script sees it.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::InternalError => "InternalError",
        }
    }

    /// Parses an error name, falling back to [`ErrorKind::Error`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "SyntaxError" => ErrorKind::SyntaxError,
            "TypeError" => ErrorKind::TypeError,
            "ReferenceError" => ErrorKind::ReferenceError,
            "RangeError" => ErrorKind::RangeError,
            "InternalError" => ErrorKind::InternalError,
            _ => ErrorKind::Error,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An uncaught error from a profiling script.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, ScriptError, SourceLocation};
///
/// let error = ScriptError::new(
///     ErrorKind::TypeError,
///     "undefined is not a function",
///     SourceLocation::new("probe.js", 4),
/// );
/// assert_eq!(error.to_string(), "TypeError: undefined is not a function (probe.js:4)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message} ({location})")]
pub struct ScriptError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Where the error was raised
    pub location: SourceLocation,
}

impl ScriptError {
    /// Creates a script error.
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }
}

/// Errors surfaced by a profiling invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfilerError {
    /// Context creation, table initialisation or function registration failed
    #[error("profiling setup failed: {0}")]
    Setup(String),

    /// An allocation failed in the identifier table, the string mirror or a
    /// profiling context
    #[error("out of memory while {what}")]
    OutOfMemory {
        /// What was being allocated
        what: String,
    },

    /// The profiling script threw or failed to evaluate
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// A traced object was missing from a completed identifier table
    #[error("heap consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The profiler was called incorrectly (nested session, bad arguments)
    #[error("usage error: {0}")]
    Usage(String),
}

impl ProfilerError {
    /// Creates an [`ProfilerError::OutOfMemory`] error.
    pub fn out_of_memory(what: impl Into<String>) -> Self {
        ProfilerError::OutOfMemory { what: what.into() }
    }

    /// Creates a [`ProfilerError::Usage`] error.
    pub fn usage(message: impl Into<String>) -> Self {
        ProfilerError::Usage(message.into())
    }

    /// Creates a [`ProfilerError::Setup`] error.
    pub fn setup(message: impl Into<String>) -> Self {
        ProfilerError::Setup(message.into())
    }

    /// Fatal errors abort a whole session and cannot be caught by script.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProfilerError::Setup(_) | ProfilerError::ConsistencyViolation(_)
        )
    }

    /// The script-visible kind used when this error is thrown into script.
    pub fn script_kind(&self) -> ErrorKind {
        match self {
            ProfilerError::Usage(_) => ErrorKind::TypeError,
            ProfilerError::Script(e) => e.kind,
            _ => ErrorKind::InternalError,
        }
    }
}

/// Result type for profiler operations
pub type ProfilerResult<T> = Result<T, ProfilerError>;
