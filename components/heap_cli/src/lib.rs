//! Heap probe CLI library
//!
//! Loads a heap snapshot into the reference heap and runs profiling scripts
//! against it, one profiling session per script.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod logging;
pub mod repl;
pub mod runtime;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use logging::{LogFormat, LogLevel};
pub use runtime::ProbeRunner;
