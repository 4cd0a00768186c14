//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::logging::{LogFormat, LogLevel};

/// Run profiling scripts against a heap snapshot.
#[derive(Debug, Parser)]
#[command(name = "heap-probe", version, about)]
pub struct Cli {
    /// Heap snapshot (JSON) to profile
    #[arg(long, value_name = "FILE")]
    pub heap: PathBuf,

    /// Profiling script to run
    #[arg(short, long, value_name = "FILE", conflicts_with = "eval")]
    pub file: Option<PathBuf>,

    /// Profiling script given inline
    #[arg(short, long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Line number the script starts on, for error attribution
    #[arg(long, default_value_t = 1)]
    pub line: u32,

    /// Value bound to the script's `argument` global
    #[arg(long, value_name = "TEXT")]
    pub arg: Option<String>,

    /// Use the GC root with this name as the named-objects root instead of
    /// the snapshot's own named objects
    #[arg(long, value_name = "NAME")]
    pub named_root: Option<String>,

    /// Start an interactive session; each entry is profiled separately
    #[arg(short, long)]
    pub repl: bool,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log format (pretty or json); overrides HEAP_PROBE_LOG_FORMAT
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Print session statistics as JSON to stderr after each run
    #[arg(long)]
    pub stats: bool,
}
