//! Session Lifecycle Integration Tests
//!
//! Teardown, the one-session-at-a-time rule and error propagation across
//! the profiler, the interpreter and the reference heap.

use std::cell::Cell;
use std::rc::Rc;

use core_types::{
    ClassInfo, FunctionInfo, GcRoot, GcThing, HeapRef, ProfilerError, ProfilerResult, PropertyKey,
    RootMapControl, ScriptValue, TargetRuntime, TargetValue, Tracer, WrapperLinks,
};
use integration_tests::fixtures::page_heap;
use interpreter::{ContextOptions, Interpreter};
use memory_manager::Heap;
use memory_profiler::{profile_memory, MemoryProfiler, ProfileRequest, ProfileValue, SessionOutcome};

/// Heap whose child tracing grows an extra edge once the walk is over,
/// as if the heap had been mutated behind the profiler's back.
struct MutatingHeap {
    heap: Heap,
    stray: HeapRef,
    calls: Cell<usize>,
    stable_calls: usize,
}

impl TargetRuntime for MutatingHeap {
    fn trace_roots(&self, tracer: &mut dyn Tracer) {
        self.heap.trace_roots(tracer)
    }

    fn trace_children(&self, object: HeapRef, tracer: &mut dyn Tracer) {
        self.heap.trace_children(object, tracer);
        self.calls.set(self.calls.get() + 1);
        if self.calls.get() > self.stable_calls {
            tracer.trace(GcThing::Object(self.stray));
        }
    }

    fn map_gc_roots(&self, visit: &mut dyn FnMut(GcRoot<'_>) -> RootMapControl) {
        self.heap.map_gc_roots(visit)
    }

    fn class_of(&self, object: HeapRef) -> Option<ClassInfo<'_>> {
        self.heap.class_of(object)
    }

    fn object_size(&self, object: HeapRef) -> usize {
        self.heap.object_size(object)
    }

    fn parent_of(&self, object: HeapRef) -> Option<HeapRef> {
        self.heap.parent_of(object)
    }

    fn prototype_of(&self, object: HeapRef) -> Option<HeapRef> {
        self.heap.prototype_of(object)
    }

    fn is_callable(&self, object: HeapRef) -> bool {
        self.heap.is_callable(object)
    }

    fn function_info(&self, object: HeapRef) -> Option<FunctionInfo> {
        self.heap.function_info(object)
    }

    fn wrapper_links(&self, object: HeapRef) -> WrapperLinks {
        self.heap.wrapper_links(object)
    }

    fn lookup_property(&self, object: HeapRef, name: &str) -> ProfilerResult<Option<TargetValue>> {
        self.heap.lookup_property(object, name)
    }

    fn enumerate_keys(&self, object: HeapRef) -> ProfilerResult<Vec<PropertyKey>> {
        self.heap.enumerate_keys(object)
    }

    fn property_entries(&self, object: HeapRef) -> ProfilerResult<Vec<(PropertyKey, TargetValue)>> {
        self.heap.property_entries(object)
    }
}

fn mutating_heap() -> MutatingHeap {
    let mut heap = Heap::new();
    let root = heap.allocate_plain();
    let child = heap.allocate_plain();
    heap.set_property(root, "child", child.into()).unwrap();
    heap.add_object_root(root, "root").unwrap();
    let stray = heap.allocate_plain();
    MutatingHeap {
        heap,
        stray,
        calls: Cell::new(0),
        // The walk traces each of the two reachable objects once.
        stable_calls: 2,
    }
}

/// Test: a consistency violation aborts the session and bypasses catch
#[test]
fn test_consistency_violation_is_fatal() {
    let target = mutating_heap();
    let profiler = MemoryProfiler::new();
    let script = "let r = 'untouched'; try { getObjectInfo(1); } catch (e) { r = 'caught'; } r";
    let err = profiler
        .profile(&target, &Interpreter::new(), &ProfileRequest::new(script, "violation.js"))
        .unwrap_err();
    assert!(matches!(err, ProfilerError::ConsistencyViolation(_)), "{err:?}");
    assert!(!profiler.is_active());
    assert_eq!(profiler.last_stats().unwrap().outcome, SessionOutcome::Failed);
}

/// Test: running out of context memory fails the session, and the next
/// session starts clean
#[test]
fn test_out_of_memory_then_fresh_session() {
    let loaded = page_heap();
    let profiler = MemoryProfiler::new();
    let tiny = Interpreter::with_options(ContextOptions::default().with_heap_limit(2048));
    let script = "let all = []; while (true) all.push(getObjectInfo(getGCRoots()[0]));";
    let err = profiler
        .profile(&loaded.heap, &tiny, &ProfileRequest::new(script, "oom.js"))
        .unwrap_err();
    assert!(matches!(err, ProfilerError::OutOfMemory { .. }), "{err:?}");

    let value = profiler
        .profile(&loaded.heap, &Interpreter::new(), &ProfileRequest::new("getGCRoots().length", "after.js"))
        .unwrap();
    assert_eq!(value, ProfileValue::Number(2.0));
}

/// Test: out-of-memory inside the script can be caught
#[test]
fn test_out_of_memory_is_catchable() {
    let loaded = page_heap();
    let tiny = Interpreter::with_options(ContextOptions::default().with_heap_limit(4096));
    let script = r#"
        let all = [];
        let outcome = 'finished';
        try { while (true) all.push(JSON.stringify(getObjectTable())); }
        catch (e) { outcome = 'caught'; }
        outcome
    "#;
    let value = MemoryProfiler::new()
        .profile(&loaded.heap, &tiny, &ProfileRequest::new(script, "oom.js"))
        .unwrap();
    assert_eq!(value.as_str(), Some("caught"));
}

/// Test: stale ids from an earlier session are just numbers to a new one
#[test]
fn test_ids_do_not_survive_sessions() {
    let mut heap = Heap::new();
    let a = heap.allocate_plain();
    heap.add_object_root(a, "a").unwrap();
    let profiler = MemoryProfiler::new();
    let count = "Object.keys(getObjectTable()).length";
    let first = profiler
        .profile(&heap, &Interpreter::new(), &ProfileRequest::new(count, "one.js"))
        .unwrap();
    assert_eq!(first, ProfileValue::Number(1.0));

    let b = heap.allocate_plain();
    heap.add_object_root(b, "b").unwrap();
    let second = profiler
        .profile(&heap, &Interpreter::new(), &ProfileRequest::new(count, "two.js"))
        .unwrap();
    assert_eq!(second, ProfileValue::Number(2.0));
    let beyond = profiler
        .profile(&heap, &Interpreter::new(), &ProfileRequest::new("getObjectInfo(3)", "three.js"))
        .unwrap();
    assert_eq!(beyond, ProfileValue::Null);
}

/// Test: the process-wide profiler rejects a nested profile and the outer
/// session still completes
#[test]
fn test_nested_global_profile_is_rejected() {
    let loaded = Rc::new(page_heap());
    let inner = Rc::clone(&loaded);
    let runtime = Interpreter::new().with_native("profileMemory", move |args: &[ScriptValue]| {
        let script = args.first().and_then(ScriptValue::as_str).unwrap_or("0").to_string();
        profile_memory(&inner.heap, &Interpreter::new(), &ProfileRequest::new(script, "nested.js"))
            .map(|_| ScriptValue::Null)
    });
    let script = r#"
        let result = 'not rejected';
        try { profileMemory('1'); } catch (e) { result = e.name; }
        result
    "#;
    let value = profile_memory(&loaded.heap, &runtime, &ProfileRequest::new(script, "outer.js")).unwrap();
    assert_eq!(value.as_str(), Some("TypeError"));
    assert!(!MemoryProfiler::global().is_active());
    assert_eq!(
        MemoryProfiler::global().last_stats().unwrap().outcome,
        SessionOutcome::Completed
    );
}
