//! Contract tests: the reference interpreter as a `ProfilingRuntime`

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use core_types::{
    ErrorKind, HostFunctions, ProfilerError, ProfilerResult, ProfilingContext, ProfilingRuntime,
    ScriptArray, ScriptString, ScriptValue, SourceLocation, StringFactory,
};
use interpreter::{ContextOptions, Interpreter};

/// Host exposing a fixed set of target strings and counting calls.
struct StringsHost {
    target: Vec<Arc<str>>,
    mirrored: Vec<ScriptString>,
    calls: usize,
}

impl StringsHost {
    fn new(target: &[&str]) -> Self {
        Self {
            target: target.iter().map(|s| Arc::from(*s)).collect(),
            mirrored: Vec::new(),
            calls: 0,
        }
    }
}

impl HostFunctions for StringsHost {
    fn call(&mut self, strings: &mut dyn StringFactory, name: &str, args: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        self.calls += 1;
        match name {
            "targetString" => {
                let index = args
                    .first()
                    .and_then(ScriptValue::as_number)
                    .ok_or_else(|| ProfilerError::usage("targetString expects an index"))?;
                let chars = self
                    .target
                    .get(index as usize)
                    .ok_or_else(|| ProfilerError::usage("index out of range"))?;
                let s = strings.external_string(chars)?;
                self.mirrored.push(s.clone());
                Ok(ScriptValue::String(s))
            }
            "describe" => Ok(ScriptValue::String(strings.new_string("copied")?)),
            "ids" => Ok(ScriptValue::Array(ScriptArray::from_vec(vec![1.0.into(), 2.0.into()]))),
            "explode" => Err(ProfilerError::ConsistencyViolation("child 9 missing".into())),
            other => Err(ProfilerError::usage(format!("unknown operation {other}"))),
        }
    }
}

fn context_with(ops: &[&str]) -> interpreter::ProbeContext {
    let mut ctx = Interpreter::new().create_context().unwrap();
    for op in ops {
        ctx.define_host_function(op).unwrap();
    }
    ctx
}

#[test]
fn test_contexts_are_isolated() {
    let runtime = Interpreter::new();
    let mut first = runtime.create_context().unwrap();
    let mut second = runtime.create_context().unwrap();
    let mut host = StringsHost::new(&[]);
    first.evaluate("var shared = 1;", "a.js", 1, &mut host).unwrap();
    assert_eq!(first.global("shared"), Some(ScriptValue::Number(1.0)));
    assert_eq!(second.global("shared"), None);
    let err = second.evaluate("shared", "b.js", 1, &mut host).unwrap_err();
    assert!(matches!(err, ProfilerError::Script(e) if e.kind == ErrorKind::ReferenceError));
}

#[test]
fn test_host_results_round_trip_through_script() {
    let mut ctx = context_with(&["targetString", "describe", "ids"]);
    let mut host = StringsHost::new(&["Window", "Object"]);
    let result = ctx
        .evaluate("targetString(1) + ':' + describe() + ':' + ids().length", "p.js", 1, &mut host)
        .unwrap();
    assert_eq!(result, ScriptValue::from("Object:copied:2"));
    assert_eq!(host.calls, 3);
}

#[test]
fn test_external_strings_alias_target_storage() {
    let mut ctx = context_with(&["targetString"]);
    let mut host = StringsHost::new(&["Function"]);
    let result = ctx.evaluate("targetString(0)", "p.js", 1, &mut host).unwrap();
    let ScriptValue::String(s) = result else {
        panic!("expected a string");
    };
    assert!(s.is_external());
    assert!(s.aliases(&host.target[0]));
    assert!(ScriptString::ptr_eq(&s, &host.mirrored[0]));
}

#[test]
fn test_usage_errors_are_catchable_type_errors() {
    let mut ctx = context_with(&["targetString"]);
    let mut host = StringsHost::new(&[]);
    let source = "let kind; try { targetString('x'); } catch (e) { kind = e.name + '/' + e.message; } kind";
    assert_eq!(
        ctx.evaluate(source, "p.js", 1, &mut host).unwrap(),
        ScriptValue::from("TypeError/usage error: targetString expects an index")
    );
}

#[test]
fn test_fatal_errors_bypass_catch_and_finally() {
    let mut ctx = context_with(&["explode"]);
    let mut host = StringsHost::new(&[]);
    let source = "let after = 0; try { explode(); } catch (e) { after = 1; } finally { after = 2; } after";
    let err = ctx.evaluate(source, "p.js", 1, &mut host).unwrap_err();
    assert_eq!(err, ProfilerError::ConsistencyViolation("child 9 missing".into()));
    assert_eq!(ctx.global("after"), Some(ScriptValue::Number(0.0)));
}

#[test]
fn test_errors_are_attributed_to_file_and_line() {
    let mut ctx = context_with(&[]);
    let mut host = StringsHost::new(&[]);
    let err = ctx
        .evaluate("let a = 1;\n\nmissing();", "probe.js", 20, &mut host)
        .unwrap_err();
    match err {
        ProfilerError::Script(e) => {
            assert_eq!(e.kind, ErrorKind::ReferenceError);
            assert_eq!(e.location, SourceLocation::new("probe.js", 22));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_natives_installed_in_every_context() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let runtime = Interpreter::new().with_native("tick", move |args: &[ScriptValue]| {
        counter.set(counter.get() + 1);
        Ok(ScriptValue::Number(args.len() as f64))
    });
    let mut host = StringsHost::new(&[]);
    for _ in 0..2 {
        let mut ctx = runtime.create_context().unwrap();
        assert_eq!(ctx.evaluate("tick(1, 2)", "n.js", 1, &mut host).unwrap(), ScriptValue::Number(2.0));
    }
    assert_eq!(calls.get(), 2);
    assert_eq!(host.calls, 0);
}

#[test]
fn test_external_strings_charge_overhead_only() {
    let runtime = Interpreter::with_options(ContextOptions {
        external_string_overhead: 10,
        ..ContextOptions::default()
    });
    let mut ctx = runtime.create_context().unwrap();
    let big: Arc<str> = Arc::from("x".repeat(10_000).as_str());
    ctx.external_string(&big).unwrap();
    assert_eq!(ctx.bytes_used(), 10);
}

#[test]
fn test_define_global_values() {
    let mut ctx = context_with(&[]);
    ctx.define_global("argument", ScriptValue::Null).unwrap();
    ctx.define_global("scriptName", ScriptValue::from("probe.js")).unwrap();
    let mut host = StringsHost::new(&[]);
    assert_eq!(
        ctx.evaluate("argument === null && scriptName", "p.js", 1, &mut host).unwrap(),
        ScriptValue::from("probe.js")
    );
}
