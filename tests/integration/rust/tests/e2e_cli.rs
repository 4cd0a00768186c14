//! End-to-End CLI Integration Tests
//!
//! Tests the complete probe through the heap_cli runner API: snapshot file
//! on disk, script file on disk, final result.

use std::io::Write;

use heap_cli::{CliError, ProbeRunner};
use integration_tests::fixtures::{PAGE_REACHABLE, PAGE_REACHABLE_FROM_WINDOW, PAGE_SNAPSHOT};
use memory_profiler::{ProfileValue, ProfilerConfig};
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn page_runner() -> (NamedTempFile, ProbeRunner) {
    let snapshot = write_temp(PAGE_SNAPSHOT);
    let runner = ProbeRunner::from_snapshot(snapshot.path()).expect("snapshot loads");
    (snapshot, runner)
}

/// Test: a histogram script run from a file
#[test]
fn test_e2e_histogram_script() {
    let (_snapshot, runner) = page_runner();
    let script = write_temp(
        r#"
        let table = getObjectTable();
        let histogram = {};
        for (let id in table) {
            let name = table[id] ?? '(none)';
            histogram[name] = (histogram[name] ?? 0) + 1;
        }
        JSON.stringify(histogram)
        "#,
    );
    let value = runner.execute_file(script.path()).expect("script runs");
    let text = value.as_str().expect("string result").to_string();
    assert!(text.contains(r#""Window":1"#), "{text}");
    assert!(text.contains(r#""Function":2"#), "{text}");
    assert!(!text.contains("Orphan"), "{text}");
}

/// Test: dumpHeap honours the configured cap
#[test]
fn test_e2e_dump_cap() {
    let (_snapshot, runner) = page_runner();
    let runner = runner.with_config(ProfilerConfig::default().with_max_dump_descriptors(3));
    let value = runner
        .execute_string("Object.keys(dumpHeap('window')).length", "dump.js")
        .unwrap();
    assert_eq!(value, ProfileValue::Number(3.0));

    let (_snapshot, runner) = page_runner();
    let value = runner
        .execute_string("Object.keys(dumpHeap('window')).length", "dump.js")
        .unwrap();
    assert_eq!(value, ProfileValue::Number(PAGE_REACHABLE_FROM_WINDOW as f64));

    let script = r#"
        let dumped = {};
        for (let root of getGCRoots()) {
            let dump = dumpHeap(root);
            for (let id in dump) {
                dumped[id] = true;
            }
        }
        Object.keys(dumped).length
    "#;
    let value = runner.execute_string(script, "dump.js").unwrap();
    assert_eq!(value, ProfileValue::Number(PAGE_REACHABLE as f64));
}

/// Test: the argument global selects what the script inspects
#[test]
fn test_e2e_argument() {
    let (_snapshot, runner) = page_runner();
    let runner = runner.with_argument(Some("handler".into()));
    let value = runner
        .execute_string("functionInfo(argument).filename", "arg.js")
        .unwrap();
    assert_eq!(value.as_str(), Some("page.js"));
}

/// Test: script errors surface with their source attribution
#[test]
fn test_e2e_script_error() {
    let (_snapshot, runner) = page_runner();
    let script = write_temp("let x = 1;\nthrow 'boom';\n");
    let err = runner.execute_file(script.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("boom"), "{message}");
    assert!(message.contains(":2"), "{message}");
    assert_eq!(err.exit_code(), 1);
    assert!(matches!(err, CliError::Profiler(_)));
}

/// Test: every run is an independent session
#[test]
fn test_e2e_repeated_runs() {
    let (_snapshot, runner) = page_runner();
    for _ in 0..3 {
        let value = runner
            .execute_string("Object.keys(getObjectTable()).length", "repeat.js")
            .unwrap();
        assert_eq!(value, ProfileValue::Number(PAGE_REACHABLE as f64));
    }
}
