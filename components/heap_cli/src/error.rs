//! Error types for the CLI

use core_types::ProfilerError;
use memory_manager::HeapError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The profiling session failed
    #[error(transparent)]
    Profiler(#[from] ProfilerError),

    /// The heap snapshot could not be loaded
    #[error(transparent)]
    Heap(#[from] HeapError),

    /// File I/O error
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// `--named-root` named a root the snapshot does not have
    #[error("no object root named '{0}'")]
    UnknownRoot(String),

    /// Logging could not be initialised
    #[error("logging error: {0}")]
    Logging(String),

    /// REPL error
    #[error("REPL error: {0}")]
    Repl(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Profiler(ProfilerError::Script(_)) => 1,
            CliError::Profiler(ProfilerError::Usage(_)) | CliError::UnknownRoot(_) => 2,
            CliError::Heap(_) | CliError::Io(_) => 3,
            _ => 4,
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
