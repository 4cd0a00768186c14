//! Snapshot Profiling Integration Tests
//!
//! Loads a page-like heap snapshot and profiles it with the reference
//! interpreter: Snapshot -> Heap -> Heap walk -> Probe script -> Result.

use integration_tests::fixtures::{page_heap, PAGE_REACHABLE};
use interpreter::Interpreter;
use memory_manager::LoadedHeap;
use memory_profiler::{MemoryProfiler, ProfileRequest, ProfileValue};

/// Helper: profile the page heap, publishing its named objects
fn profile(loaded: &LoadedHeap, script: &str) -> ProfileValue {
    let mut request = ProfileRequest::new(script, "page-probe.js");
    if let Some(root) = loaded.named_objects {
        request = request.with_named_objects(root);
    }
    MemoryProfiler::new()
        .profile(&loaded.heap, &Interpreter::new(), &request)
        .expect("profiling failed")
}

fn profile_str(loaded: &LoadedHeap, script: &str) -> String {
    match profile(loaded, script) {
        ProfileValue::String(s) => s,
        other => panic!("expected a string, got {other:?}"),
    }
}

/// Test: a script-side reachability walk finds exactly the tracked objects
#[test]
fn test_script_walk_matches_table() {
    let loaded = page_heap();
    let script = r#"
        function walk() {
            let seen = {};
            let pending = getGCRoots().slice(0);
            let count = 0;
            while (pending.length > 0) {
                let next = [];
                for (let id of pending) {
                    if (id in seen) continue;
                    seen[id] = true;
                    count++;
                    for (let child of getObjectInfo(id).children) next.push(child);
                }
                pending = next;
            }
            return count;
        }
        walk() === Object.keys(getObjectTable()).length ? walk() : -1
    "#;
    assert_eq!(profile(&loaded, script), ProfileValue::Number(PAGE_REACHABLE as f64));
}

/// Test: unreachable objects never get ids
#[test]
fn test_unreachable_objects_are_absent() {
    let loaded = page_heap();
    let script = r#"
        let table = getObjectTable();
        let orphans = 0;
        for (let id in table) if (table[id] === 'Orphan') orphans++;
        orphans
    "#;
    assert_eq!(profile(&loaded, script), ProfileValue::Number(0.0));
}

/// Test: non-object roots are skipped
#[test]
fn test_gc_roots_are_objects_only() {
    let loaded = page_heap();
    assert_eq!(profile(&loaded, "getGCRoots().length"), ProfileValue::Number(2.0));
}

/// Test: named objects resolve and appear in source order
#[test]
fn test_named_objects() {
    let loaded = page_heap();
    assert_eq!(
        profile_str(&loaded, "Object.keys(getNamedObjects()).join(',')"),
        "window,handler,wrapper"
    );
    assert_eq!(
        profile_str(&loaded, "getObjectInfo('window').nativeClass"),
        "Window"
    );
}

/// Test: scripted and native function metadata
#[test]
fn test_function_metadata() {
    let loaded = page_heap();
    let script = r#"
        let f = getObjectInfo('handler');
        let proto = getObjectInfo('window').prototype;
        let native = getObjectInfo(getObjectProperty(proto, 'toString'));
        [f.name, f.filename, f.lineStart, f.lineEnd, f.scriptSize,
         native.name, 'filename' in native, 'lineStart' in native].join(' ')
    "#;
    assert_eq!(profile_str(&loaded, script), "onload page.js 10 12 96 toString false false");
}

/// Test: wrapper links point at the wrapped and inner objects
#[test]
fn test_wrapper_links() {
    let loaded = page_heap();
    let script = r#"
        let w = getObjectInfo('wrapper');
        let body = getObjectProperty(getObjectProperty('window', 'document'), 'body');
        let div = getObjectProperty(body, 'firstChild');
        (w.wrappedObject === div) + ' ' + (w.innerObject === body) + ' ' + ('outerObject' in w)
    "#;
    assert_eq!(profile_str(&loaded, script), "true true false");
}

/// Test: standard enumeration versus the low-level iterator
#[test]
fn test_property_enumeration_modes() {
    let loaded = page_heap();
    let script = r#"
        Object.keys(getObjectProperties('window')).join(',') + '|' +
        Object.keys(getObjectProperties('window', true)).join(',')
    "#;
    assert_eq!(
        profile_str(&loaded, script),
        "document,onload,title,toString|document,onload,title,internalSlot"
    );
}

/// Test: only object identity and strings survive property reads
#[test]
fn test_property_value_kinds() {
    let loaded = page_heap();
    let script = r#"
        let doc = getObjectProperty('window', 'document');
        let div = getObjectProperty(getObjectProperty(doc, 'body'), 'firstChild');
        [getObjectProperty(div, 'id'), getObjectProperty(div, 'count'),
         getObjectProperty(div, 'missing'), typeof doc].join(',')
    "#;
    assert_eq!(profile_str(&loaded, script), "main,,,number");
}

/// Test: equal target strings are mirrored once
#[test]
fn test_shared_strings_mirror_once() {
    let loaded = page_heap();
    let profiler = MemoryProfiler::new();
    let script = r#"
        let doc = getObjectProperty('window', 'document');
        getObjectProperty('window', 'title') === getObjectProperty(doc, 'title')
    "#;
    let mut request = ProfileRequest::new(script, "strings.js");
    if let Some(root) = loaded.named_objects {
        request = request.with_named_objects(root);
    }
    let value = profiler.profile(&loaded.heap, &Interpreter::new(), &request).unwrap();
    assert_eq!(value, ProfileValue::Boolean(true));
    assert_eq!(profiler.last_stats().unwrap().strings_mirrored, 1);
}

/// Test: class tallies cover every tracked object
#[test]
fn test_class_tallies() {
    let loaded = page_heap();
    let script = r#"
        let tallies = getClassTallies();
        let total = 0;
        for (let name in tallies) total += tallies[name].count;
        total + ' ' + tallies.Function.count + ' ' + ('Orphan' in tallies)
    "#;
    assert_eq!(profile_str(&loaded, script), format!("{PAGE_REACHABLE} 2 false"));
}
