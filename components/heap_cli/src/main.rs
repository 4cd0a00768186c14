//! heap-probe
//!
//! Entry point for the heap probe. Parses CLI arguments, loads the heap
//! snapshot and delegates to the ProbeRunner for execution.

use std::process::ExitCode;

use clap::Parser as ClapParser;
use heap_cli::logging::init_logging;
use heap_cli::{Cli, CliResult, ProbeRunner};
use memory_profiler::ProfileValue;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_level, cli.log_format) {
        eprintln!("Warning: {e}");
    }
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let mut runner = ProbeRunner::from_snapshot(&cli.heap)?
        .with_argument(cli.arg.clone())
        .with_line(cli.line);
    if let Some(name) = &cli.named_root {
        runner = runner.with_named_root(name)?;
    }

    let result = if let Some(file) = &cli.file {
        Some(runner.execute_file(file))
    } else if let Some(code) = &cli.eval {
        Some(runner.execute_string(code, "<eval>"))
    } else if cli.repl {
        runner.repl()?;
        None
    } else {
        println!("heap-probe {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Usage:");
        println!("  heap-probe --heap <SNAPSHOT> --file <FILE>   Run a profiling script");
        println!("  heap-probe --heap <SNAPSHOT> --eval <CODE>   Run an inline profiling script");
        println!("  heap-probe --heap <SNAPSHOT> --repl          Start an interactive session");
        println!();
        println!("Run 'heap-probe --help' for more options.");
        None
    };

    if cli.stats {
        if let Some(stats) = runner.last_stats() {
            if let Ok(text) = serde_json::to_string(&stats) {
                eprintln!("{text}");
            }
        }
    }

    if let Some(result) = result {
        let value = result?;
        if value != ProfileValue::Undefined {
            println!("{value}");
        }
    }
    Ok(())
}
