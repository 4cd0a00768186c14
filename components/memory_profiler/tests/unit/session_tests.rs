use std::cell::RefCell;
use std::rc::Rc;

use core_types::ProfilerError;
use interpreter::Interpreter;
use memory_manager::Heap;
use memory_profiler::{
    MemoryProfiler, ProfileRequest, ProfileValue, ProfilerConfig, ProfilingSession, SessionOutcome,
    SessionState,
};

fn small_heap() -> Heap {
    let mut heap = Heap::new();
    let root = heap.allocate_plain();
    let name = heap.string("root object");
    heap.set_property(root, "name", name).unwrap();
    heap.add_object_root(root, "root").unwrap();
    heap
}

#[test]
fn test_session_states() {
    let heap = small_heap();
    let runtime = Interpreter::new();
    let request = ProfileRequest::new("getGCRoots().length", "states.js");
    let mut session = ProfilingSession::new(&heap, &runtime, ProfilerConfig::default());
    assert_eq!(session.state(), SessionState::Uninitialized);

    session.setup(&request).unwrap();
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(session.object_count(), 1);

    assert_eq!(session.run(&request).unwrap(), ProfileValue::Number(1.0));
    assert_eq!(session.state(), SessionState::Completed);

    let again = session.run(&request).unwrap_err();
    assert!(matches!(again, ProfilerError::Usage(_)));
    session.teardown();
    assert_eq!(session.state(), SessionState::Completed);
}

#[test]
fn test_script_error_fails_session() {
    let heap = small_heap();
    let runtime = Interpreter::new();
    let request = ProfileRequest::new("throw new_thing;", "fail.js");
    let mut session = ProfilingSession::new(&heap, &runtime, ProfilerConfig::default());
    session.setup(&request).unwrap();
    let err = session.run(&request).unwrap_err();
    assert!(matches!(err, ProfilerError::Script(_)));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.stats(Some(&err)).outcome, SessionOutcome::Failed);
}

#[test]
fn test_result_conversion() {
    let heap = small_heap();
    let profiler = MemoryProfiler::new();
    let cases = [
        ("'text'", ProfileValue::String("text".into())),
        ("42", ProfileValue::Number(42.0)),
        ("true", ProfileValue::Boolean(true)),
        ("null", ProfileValue::Null),
        ("[1, 2]", ProfileValue::Undefined),
        ("({a: 1})", ProfileValue::Undefined),
        ("let x = 1;", ProfileValue::Undefined),
    ];
    for (script, expected) in cases {
        let request = ProfileRequest::new(script, "convert.js");
        let value = profiler.profile(&heap, &Interpreter::new(), &request).unwrap();
        assert_eq!(value, expected, "script {script}");
    }
}

#[test]
fn test_argument_and_script_name_globals() {
    let heap = small_heap();
    let profiler = MemoryProfiler::new();
    let request = ProfileRequest::new("scriptName + ':' + argument", "globals.js").with_argument("abc");
    let value = profiler.profile(&heap, &Interpreter::new(), &request).unwrap();
    assert_eq!(value.as_str(), Some("globals.js:abc"));

    let request = ProfileRequest::new("argument === null", "globals.js");
    let value = profiler.profile(&heap, &Interpreter::new(), &request).unwrap();
    assert_eq!(value, ProfileValue::Boolean(true));
}

#[test]
fn test_stats_record_last_session() {
    let heap = small_heap();
    let profiler = MemoryProfiler::new();
    let script = "let r = getGCRoots()[0]; getObjectProperty(r, 'name'); getObjectProperty(r, 'name');";
    profiler
        .profile(&heap, &Interpreter::new(), &ProfileRequest::new(script, "stats.js"))
        .unwrap();
    let stats = profiler.last_stats().unwrap();
    assert_eq!(stats.objects, 1);
    assert_eq!(stats.host_calls, 3);
    assert_eq!(stats.strings_mirrored, 1);
    assert_eq!(stats.outcome, SessionOutcome::Completed);
    assert!(stats.error.is_none());
    assert!(!profiler.is_active());
}

#[test]
fn test_print_output_reaches_handler() {
    let heap = small_heap();
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lines);
    let runtime = Interpreter::new().with_print_handler(move |line| sink.borrow_mut().push(line.to_string()));
    let request = ProfileRequest::new("print(getObjectInfo(1).nativeClass);", "print.js");
    MemoryProfiler::new().profile(&heap, &runtime, &request).unwrap();
    assert_eq!(*lines.borrow(), vec!["Object".to_string()]);
}
