//! REPL (Read-Eval-Print Loop) implementation
//!
//! Each complete entry is profiled in its own session, so ids printed by one
//! entry mean nothing to the next.

use memory_profiler::ProfileValue;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::{CliError, CliResult};
use crate::runtime::ProbeRunner;

/// File name REPL entries are attributed to.
const REPL_FILENAME: &str = "<repl>";

/// Run the interactive REPL
pub fn run_repl(runner: &ProbeRunner) -> CliResult<()> {
    let mut editor =
        DefaultEditor::new().map_err(|e| CliError::Repl(format!("failed to initialize editor: {e}")))?;

    println!("heap-probe {}", env!("CARGO_PKG_VERSION"));
    println!("Type a profiling script, .help for commands, or .exit to quit.");

    let mut line_buffer = String::new();

    loop {
        let prompt = if line_buffer.is_empty() { "> " } else { "... " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if line_buffer.is_empty() && trimmed.starts_with('.') {
                    if handle_repl_command(trimmed, runner) {
                        break;
                    }
                    continue;
                }

                if !line_buffer.is_empty() {
                    line_buffer.push('\n');
                }
                line_buffer.push_str(&line);

                if !is_input_complete(&line_buffer) {
                    continue;
                }
                let _ = editor.add_history_entry(line_buffer.as_str());
                match runner.execute_string(&line_buffer, REPL_FILENAME) {
                    Ok(value) => println!("{}", format_value(&value)),
                    Err(e) => eprintln!("Error: {e}"),
                }
                line_buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if line_buffer.is_empty() {
                    println!("Press Ctrl-D or type .exit to quit");
                } else {
                    println!("^C");
                    line_buffer.clear();
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(CliError::Repl(format!("readline error: {err}"))),
        }
    }

    Ok(())
}

/// Handle a dot command. Returns true when the REPL should exit.
fn handle_repl_command(command: &str, runner: &ProbeRunner) -> bool {
    match command {
        ".exit" | ".quit" => return true,
        ".help" => {
            println!("REPL commands:");
            println!("  .help     show this help message");
            println!("  .stats    show statistics of the last session");
            println!("  .heap     show the size of the loaded heap");
            println!("  .exit     exit the REPL");
        }
        ".stats" => match runner.last_stats() {
            Some(stats) => match serde_json::to_string_pretty(&stats) {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("Error: {e}"),
            },
            None => println!("no session has run yet"),
        },
        ".heap" => println!("{} objects", runner.heap().len()),
        _ => {
            println!("Unknown command: {command}");
            println!("Type .help for available commands");
        }
    }
    false
}

/// Check if the input appears to be complete
///
/// Balanced braces, brackets and parentheses outside string literals.
fn is_input_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = None;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match in_string {
            Some(quote) => {
                if c == '\\' {
                    escape_next = true;
                } else if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '"' | '\'' => in_string = Some(c),
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => depth -= 1,
                _ => {}
            },
        }
    }

    depth <= 0 && in_string.is_none()
}

/// Format a result for display; strings are quoted.
fn format_value(value: &ProfileValue) -> String {
    match value {
        ProfileValue::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}
