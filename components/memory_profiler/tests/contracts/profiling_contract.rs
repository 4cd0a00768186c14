use std::rc::Rc;

use core_types::{ErrorKind, HeapRef, ProfilerError, ScriptValue};
use interpreter::{ContextOptions, Interpreter};
use memory_manager::{FunctionData, Heap};
use memory_profiler::{MemoryProfiler, ProfileRequest, ProfileValue, ProfilerConfig, SessionOutcome};

struct Scene {
    heap: Heap,
    a: HeapRef,
    names: HeapRef,
}

/// A small graph: `a.x = b`, an empty object, function `foo` from
/// test.js:10-12, and a named-objects holder naming `a`.
fn scene() -> Scene {
    let mut heap = Heap::new();
    let a = heap.allocate_plain();
    let b = heap.allocate_plain();
    let empty = heap.allocate_plain();
    heap.set_property(a, "x", b.into()).unwrap();
    let greeting = heap.string("hello");
    heap.set_property(a, "greeting", greeting.clone()).unwrap();
    heap.set_property(b, "greeting", greeting).unwrap();
    let name = heap.intern("foo");
    let foo = heap.allocate_function(FunctionData::scripted(Some(name), "test.js", 10, 3, 120));
    let names = heap.allocate_plain();
    heap.set_property(names, "a", a.into()).unwrap();
    for (object, label) in [(a, "a"), (empty, "empty"), (foo, "foo"), (names, "NamedObjects")] {
        heap.add_object_root(object, label).unwrap();
    }
    Scene { heap, a, names }
}

fn run(scene: &Scene, script: &str) -> ProfileValue {
    let request = ProfileRequest::new(script, "contract.js").with_named_objects(scene.names);
    MemoryProfiler::new()
        .profile(&scene.heap, &Interpreter::new(), &request)
        .unwrap()
}

fn run_str(scene: &Scene, script: &str) -> String {
    match run(scene, script) {
        ProfileValue::String(s) => s,
        other => panic!("expected a string result, got {other:?}"),
    }
}

/// Script expression for the id published under `label`.
fn id_expr(label: &str) -> String {
    format!("getNamedObjects()['{label}']")
}

#[test]
fn test_object_table_has_dense_keys() {
    let scene = scene();
    let keys = run_str(&scene, "JSON.stringify(Object.keys(getObjectTable()))");
    let parsed: Vec<String> = serde_json::from_str(&keys).unwrap();
    let expected: Vec<String> = (1..=parsed.len()).map(|i| i.to_string()).collect();
    assert_eq!(parsed, expected);
    assert_eq!(parsed.len(), 5);
}

#[test]
fn test_gc_roots_are_table_keys() {
    let scene = scene();
    let script = r#"
        let table = getObjectTable();
        let ok = true;
        for (let id of getGCRoots()) {
            if (!(id in table)) ok = false;
        }
        ok && getGCRoots().length === 4
    "#;
    assert_eq!(run(&scene, script), ProfileValue::Boolean(true));
}

#[test]
fn test_empty_object() {
    let scene = scene();
    let script = r#"
        let id = getGCRoots()[1];
        let info = getObjectInfo(id);
        info.children.length + ':' + Object.keys(getObjectProperties(id)).length
    "#;
    assert_eq!(run_str(&scene, script), "0:0");
}

#[test]
fn test_property_reports_target_identity() {
    let scene = scene();
    let script = format!(
        "let a = {}; let b = getObjectProperty(a, 'x'); getObjectInfo(a).children.indexOf(b) >= 0 && typeof b === 'number'",
        id_expr("a")
    );
    assert_eq!(run(&scene, &script), ProfileValue::Boolean(true));
}

#[test]
fn test_same_target_string_is_mirrored_once() {
    let scene = scene();
    let script = format!(
        "let a = {}; let b = getObjectProperty(a, 'x'); getObjectProperty(a, 'greeting') + getObjectProperty(b, 'greeting')",
        id_expr("a")
    );
    let profiler = MemoryProfiler::new();
    let request = ProfileRequest::new(script, "mirror.js").with_named_objects(scene.names);
    let value = profiler.profile(&scene.heap, &Interpreter::new(), &request).unwrap();
    assert_eq!(value.as_str(), Some("hellohello"));
    assert_eq!(profiler.last_stats().unwrap().strings_mirrored, 1);
}

#[test]
fn test_function_metadata() {
    let scene = scene();
    let script = r#"
        let info = getObjectInfo(getGCRoots()[2]);
        [info.name, info.filename, info.lineStart, info.lineEnd, info.nativeClass].join('|')
    "#;
    assert_eq!(run_str(&scene, script), "foo|test.js|10|12|Function");
}

#[test]
fn test_absent_fields_are_omitted() {
    let scene = scene();
    let script = r#"
        let info = getObjectInfo(getGCRoots()[0]);
        ('parent' in info) + ',' + ('name' in info) + ',' + ('wrappedObject' in info) + ',' + ('children' in info)
    "#;
    assert_eq!(run_str(&scene, script), "false,false,false,true");
}

#[test]
fn test_named_objects() {
    let scene = scene();
    assert_eq!(
        run_str(&scene, "JSON.stringify(Object.keys(getNamedObjects()))"),
        r#"["a"]"#
    );
    assert_eq!(
        run(&scene, "getObjectInfo('a').id === getGCRoots()[0]"),
        ProfileValue::Boolean(true)
    );
    assert_eq!(run(&scene, "getObjectInfo('missing')"), ProfileValue::Null);

    let request = ProfileRequest::new("Object.keys(getNamedObjects()).length", "none.js");
    let value = MemoryProfiler::new()
        .profile(&scene.heap, &Interpreter::new(), &request)
        .unwrap();
    assert_eq!(value, ProfileValue::Number(0.0));
}

#[test]
fn test_usage_errors_are_catchable() {
    let scene = scene();
    let script = r#"
        let caught = '';
        try { getObjectInfo(true); } catch (e) { caught = e.name; }
        caught
    "#;
    assert_eq!(run_str(&scene, script), "TypeError");
}

#[test]
fn test_uncaught_usage_error_fails_session() {
    let scene = scene();
    let profiler = MemoryProfiler::new();
    let request = ProfileRequest::new("getObjectInfo(-3)", "bad.js");
    let err = profiler.profile(&scene.heap, &Interpreter::new(), &request).unwrap_err();
    assert!(matches!(err, ProfilerError::Usage(_)));
    let stats = profiler.last_stats().unwrap();
    assert_eq!(stats.outcome, SessionOutcome::Failed);
    assert!(stats.error.is_some());
    assert!(!profiler.is_active());
}

#[test]
fn test_nested_profile_is_rejected_and_outer_completes() {
    let scene = Rc::new(scene());
    let profiler = Rc::new(MemoryProfiler::new());
    let inner_scene = Rc::clone(&scene);
    let inner_profiler = Rc::clone(&profiler);
    let runtime = Interpreter::new().with_native("profileAgain", move |_args: &[ScriptValue]| {
        let request = ProfileRequest::new("1", "inner.js");
        inner_profiler
            .profile(&inner_scene.heap, &Interpreter::new(), &request)
            .map(|_| ScriptValue::Boolean(true))
    });
    let script = r#"
        let message = 'none';
        try { profileAgain(); } catch (e) { message = e.name + '/' + e.message; }
        message
    "#;
    let request = ProfileRequest::new(script, "outer.js");
    let value = profiler.profile(&scene.heap, &runtime, &request).unwrap();
    let message = value.as_str().unwrap().to_string();
    assert!(message.starts_with("TypeError/"), "{message}");
    assert!(message.contains("already running"), "{message}");
    assert_eq!(profiler.last_stats().unwrap().outcome, SessionOutcome::Completed);
}

#[test]
fn test_fresh_session_after_failure() {
    let scene = scene();
    let profiler = MemoryProfiler::new();
    let failing = ProfileRequest::new("syntax error here (", "broken.js");
    let err = profiler.profile(&scene.heap, &Interpreter::new(), &failing).unwrap_err();
    match err {
        ProfilerError::Script(script) => assert_eq!(script.kind, ErrorKind::SyntaxError),
        other => panic!("expected a syntax error, got {other:?}"),
    }
    let request = ProfileRequest::new("Object.keys(getObjectTable()).length", "after.js");
    let value = profiler.profile(&scene.heap, &Interpreter::new(), &request).unwrap();
    assert_eq!(value, ProfileValue::Number(5.0));
}

#[test]
fn test_out_of_memory_in_context_is_reported() {
    let scene = scene();
    let runtime = Interpreter::with_options(ContextOptions::default().with_heap_limit(512));
    let script = "let parts = []; while (true) { parts.push(JSON.stringify(getObjectTable())); }";
    let err = MemoryProfiler::new()
        .profile(&scene.heap, &runtime, &ProfileRequest::new(script, "oom.js"))
        .unwrap_err();
    assert!(matches!(err, ProfilerError::OutOfMemory { .. }), "{err:?}");
}

#[test]
fn test_helpers() {
    let scene = scene();
    let script = r#"
        let tallies = getClassTallies();
        let dump = dumpHeap('a');
        [tallies.Object.count, tallies.Function.count, Object.keys(dump).length,
         enumerate('a').join(','), functionInfo(getGCRoots()[2]).lineEnd].join(' ')
    "#;
    assert_eq!(run_str(&scene, script), "4 1 2 x,greeting 12");
}

#[test]
fn test_helpers_absent_when_disabled() {
    let scene = scene();
    let profiler = MemoryProfiler::with_config(ProfilerConfig::default().with_helpers(false));
    let request = ProfileRequest::new("typeof dumpHeap + ',' + typeof getObjectTable", "plain.js");
    let value = profiler.profile(&scene.heap, &Interpreter::new(), &request).unwrap();
    assert_eq!(value.as_str(), Some("undefined,function"));
}

#[test]
fn test_alternate_property_iteration() {
    let mut scene = scene();
    scene
        .heap
        .define_property(scene.a, "hidden".into(), core_types::TargetValue::Null, false)
        .unwrap();
    let script = format!(
        "let a = {}; Object.keys(getObjectProperties(a)).length + ',' + Object.keys(getObjectProperties(a, true)).length",
        id_expr("a")
    );
    assert_eq!(run_str(&scene, &script), "2,3");
}
