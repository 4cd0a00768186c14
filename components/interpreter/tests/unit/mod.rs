//! Unit tests for probe language semantics

use std::cell::RefCell;
use std::rc::Rc;

use core_types::{
    ErrorKind, HostFunctions, ProfilerError, ProfilerResult, ProfilingContext, ProfilingRuntime,
    ScriptError, ScriptValue, StringFactory,
};
use interpreter::{ContextOptions, Interpreter};

struct NoHost;

impl HostFunctions for NoHost {
    fn call(&mut self, _: &mut dyn StringFactory, name: &str, _: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        Err(ProfilerError::usage(format!("unexpected host call {name}")))
    }
}

fn run(source: &str) -> ProfilerResult<ScriptValue> {
    let mut ctx = Interpreter::new().create_context()?;
    ctx.evaluate(source, "unit.js", 1, &mut NoHost)
}

fn eval(source: &str) -> ScriptValue {
    run(source).unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

fn eval_str(source: &str) -> String {
    match eval(source) {
        ScriptValue::String(s) => s.as_str().to_owned(),
        other => panic!("{source:?} returned {other:?}"),
    }
}

fn script_error(source: &str) -> ScriptError {
    match run(source) {
        Err(ProfilerError::Script(e)) => e,
        other => panic!("{source:?} returned {other:?}"),
    }
}

fn printed(source: &str) -> Vec<String> {
    let lines = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&lines);
    let interpreter = Interpreter::new().with_print_handler(move |line| sink.borrow_mut().push(line.to_owned()));
    let mut ctx = interpreter.create_context().unwrap();
    ctx.evaluate(source, "unit.js", 1, &mut NoHost).unwrap();
    let result = lines.borrow().clone();
    result
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_arithmetic_and_precedence() {
    assert_eq!(eval("1 + 2 * 3"), ScriptValue::Number(7.0));
    assert_eq!(eval("(1 + 2) * 3"), ScriptValue::Number(9.0));
    assert_eq!(eval("7 % 4 - 10 / 4"), ScriptValue::Number(0.5));
    assert_eq!(eval("-'3' + +'4'"), ScriptValue::Number(1.0));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_str("'id ' + 5"), "id 5");
    assert_eq!(eval_str("1 + 2 + 'x'"), "3x");
    assert_eq!(eval_str("'' + [1, 2] + {}"), "1,2[object Object]");
    assert_eq!(eval_str("'n' + 0.25 + null"), "n0.25null");
}

#[test]
fn test_comparison_and_equality() {
    assert_eq!(eval("1 < 2 && 'b' > 'a' && 2 >= 2"), ScriptValue::Boolean(true));
    assert_eq!(eval("'1' == 1"), ScriptValue::Boolean(true));
    assert_eq!(eval("'1' === 1"), ScriptValue::Boolean(false));
    assert_eq!(eval("null == undefined"), ScriptValue::Boolean(true));
    assert_eq!(eval("null !== undefined"), ScriptValue::Boolean(true));
    assert_eq!(eval("NaN == NaN"), ScriptValue::Boolean(false));
}

#[test]
fn test_logical_operators_short_circuit() {
    assert_eq!(eval("let hit = false; false && (hit = true); hit"), ScriptValue::Boolean(false));
    assert_eq!(eval_str("null || 'fallback'"), "fallback");
    assert_eq!(eval("0 ?? 5"), ScriptValue::Number(0.0));
    assert_eq!(eval("undefined ?? 5"), ScriptValue::Number(5.0));
    assert_eq!(eval_str("true ? 'yes' : 'no'"), "yes");
}

#[test]
fn test_typeof() {
    assert_eq!(eval_str("typeof 1"), "number");
    assert_eq!(eval_str("typeof null"), "object");
    assert_eq!(eval_str("typeof print"), "function");
    assert_eq!(eval_str("typeof neverDeclared"), "undefined");
    assert_eq!(eval_str("typeof [1]"), "object");
}

#[test]
fn test_in_operator() {
    assert_eq!(eval("'a' in {a: 1}"), ScriptValue::Boolean(true));
    assert_eq!(eval("1 in [5, 6]"), ScriptValue::Boolean(true));
    assert_eq!(eval("2 in [5, 6]"), ScriptValue::Boolean(false));
    assert_eq!(script_error("'a' in 5").kind, ErrorKind::TypeError);
}

// ============================================================================
// Statements and scoping
// ============================================================================

#[test]
fn test_completion_value_is_last_expression_statement() {
    assert_eq!(eval("let a = 1; a + 1; let b = 2;"), ScriptValue::Number(2.0));
    assert_eq!(eval("let x = 3;"), ScriptValue::Undefined);
    assert_eq!(eval("function f() { 99; return 1; } f(); 'done'"), ScriptValue::from("done"));
}

#[test]
fn test_function_hoisting_and_closures() {
    let source = "
        let counter = makeCounter();
        counter(); counter();
        counter()
        function makeCounter() {
            let count = 0;
            return function () { count = count + 1; return count; };
        }
    ";
    assert_eq!(eval(source), ScriptValue::Number(3.0));
}

#[test]
fn test_arrow_functions() {
    assert_eq!(eval("const sq = x => x * x; sq(4)"), ScriptValue::Number(16.0));
    assert_eq!(eval("const add = (a, b) => { return a + b; }; add(2, 3)"), ScriptValue::Number(5.0));
    assert_eq!(eval("((a, b) => b)(1)"), ScriptValue::Undefined);
}

#[test]
fn test_block_scoping_and_var() {
    assert_eq!(eval("let x = 1; { let x = 2; } x"), ScriptValue::Number(1.0));
    assert_eq!(eval("function f() { if (true) { var v = 7; } return v; } f()"), ScriptValue::Number(7.0));
    assert_eq!(eval("function g() { return typeof hoisted; var hoisted = 1; } g()"), ScriptValue::from("undefined"));
}

#[test]
fn test_const_assignment_is_type_error() {
    let err = script_error("const k = 1;\nk = 2;");
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.location.line, 2);
}

#[test]
fn test_implicit_global() {
    assert_eq!(eval("function f() { leaked = 4; } f(); leaked"), ScriptValue::Number(4.0));
}

#[test]
fn test_loops() {
    assert_eq!(eval("let s = 0; for (let i = 0; i < 5; i++) { s += i; } s"), ScriptValue::Number(10.0));
    assert_eq!(eval("let n = 0; while (true) { n++; if (n > 3) break; } n"), ScriptValue::Number(4.0));
    assert_eq!(
        eval("let odd = 0; for (let i = 0; i < 6; i++) { if (i % 2 == 0) continue; odd++; } odd"),
        ScriptValue::Number(3.0)
    );
    assert_eq!(eval_str("let out = ''; for (const v of ['a', 'b']) out += v; out"), "ab");
    assert_eq!(eval_str("let ks = []; for (const k in {x: 1, y: 2}) ks.push(k); ks.join('|')"), "x|y");
    assert_eq!(eval_str("let is = ''; for (let i in [7, 8]) is += i; is"), "01");
}

#[test]
fn test_return_from_inside_loop() {
    let source = "function find(xs) { for (const x of xs) { if (x > 2) return x; } return -1; } find([1, 5, 9])";
    assert_eq!(eval(source), ScriptValue::Number(5.0));
}

#[test]
fn test_for_of_non_iterable() {
    assert_eq!(script_error("for (const x of 5) {}").kind, ErrorKind::TypeError);
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_try_catch_binds_thrown_value() {
    assert_eq!(eval_str("let m; try { throw 'boom'; } catch (e) { m = e; } m"), "boom");
    assert_eq!(eval_str("let n; try { undefinedName; } catch (e) { n = e.name; } n"), "ReferenceError");
    assert_eq!(eval_str("let m; try { null.x; } catch (e) { m = e.message; } m"), "cannot read property 'x' of null");
}

#[test]
fn test_finally_runs() {
    assert_eq!(eval("let f = 0; try { f = 1; } finally { f = f + 10; } f"), ScriptValue::Number(11.0));
    assert_eq!(
        eval("function g() { try { return 1; } finally { hits = 1; } } let hits = 0; g() + hits"),
        ScriptValue::Number(2.0)
    );
}

#[test]
fn test_uncaught_throw_of_error_object() {
    let err = script_error("let a = 1;\nthrow {name: 'RangeError', message: 'out of range'};");
    assert_eq!(err.kind, ErrorKind::RangeError);
    assert_eq!(err.message, "out of range");
    assert_eq!(err.location.line, 2);
}

#[test]
fn test_not_a_function_message() {
    let err = script_error("let o = {};\no.missing();");
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "o.missing is not a function");
}

#[test]
fn test_recursion_limit() {
    let interpreter = Interpreter::with_options(ContextOptions::default().with_max_call_depth(16));
    let mut ctx = interpreter.create_context().unwrap();
    let err = ctx.evaluate("function r(n) { return r(n + 1); } r(0)", "deep.js", 1, &mut NoHost).unwrap_err();
    match err {
        ProfilerError::Script(e) => assert_eq!(e.kind, ErrorKind::RangeError),
        other => panic!("unexpected {other:?}"),
    }
    let ok = ctx.evaluate("function d(n) { return n == 0 ? 0 : 1 + d(n - 1); } d(10)", "deep.js", 1, &mut NoHost);
    assert_eq!(ok.unwrap(), ScriptValue::Number(10.0));
}

#[test]
fn test_nesting_limit_is_a_syntax_error() {
    let source = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
    let err = script_error(&source);
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert_eq!(err.message, "too much nesting");

    let interpreter = Interpreter::with_options(ContextOptions::default().with_max_nesting_depth(8));
    let mut ctx = interpreter.create_context().unwrap();
    let err = ctx.evaluate("[[[[[[[[1]]]]]]]]", "nest.js", 1, &mut NoHost).unwrap_err();
    assert!(matches!(err, ProfilerError::Script(e) if e.kind == ErrorKind::SyntaxError));
    assert_eq!(ctx.evaluate("[[1]].length", "nest.js", 1, &mut NoHost).unwrap(), ScriptValue::Number(1.0));
}

#[test]
fn test_eval_depth_limit() {
    let options = ContextOptions::default().with_max_call_depth(1000).with_max_eval_depth(64);
    let mut ctx = Interpreter::with_options(options).create_context().unwrap();
    let source = "function d(n) { return n == 0 ? 0 : 1 + d(n - 1); }\ntry { d(500) } catch (e) { e.name + ': ' + e.message }";
    let caught = ctx.evaluate(source, "deep.js", 1, &mut NoHost).unwrap();
    assert_eq!(caught.as_str(), Some("RangeError: too much recursion"));
    assert_eq!(ctx.evaluate("d(5)", "deep.js", 1, &mut NoHost).unwrap(), ScriptValue::Number(5.0));
}

#[test]
fn test_cyclic_values() {
    let err = script_error("let o = {};\no.self = o;\nJSON.stringify(o)");
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "cyclic object value");
    assert_eq!(err.location.line, 3);

    assert_eq!(
        eval_str("let o = {}; o.self = o; try { JSON.stringify(o) } catch (e) { e.name }"),
        "TypeError"
    );
    assert_eq!(eval_str("let a = [1]; a.push(a); '' + a"), "1,");
    assert_eq!(eval_str("let a = [1, 2]; a.push(a); a.join('-')"), "1-2-");
    assert_eq!(printed("let a = []; a.push(a, 'x'); print(a)"), vec![",x"]);
}

// ============================================================================
// Builtins and methods
// ============================================================================

#[test]
fn test_print_joins_arguments() {
    assert_eq!(printed("print('a', 1, [2, 3], null)"), vec!["a 1 2,3 null"]);
    assert_eq!(printed("print(); print(1.5)"), vec!["", "1.5"]);
}

#[test]
fn test_json_stringify() {
    assert_eq!(eval_str("JSON.stringify({a: 1, b: [true, null], c: undefined})"), r#"{"a":1,"b":[true,null]}"#);
    assert_eq!(eval_str("JSON.stringify('q')"), r#""q""#);
    assert_eq!(eval_str("JSON.stringify({a: 1}, null, 2)"), "{\n  \"a\": 1\n}");
    assert_eq!(eval("JSON.stringify(undefined)"), ScriptValue::Undefined);
}

#[test]
fn test_object_keys() {
    assert_eq!(eval_str("Object.keys({z: 1, a: 2}).join()"), "z,a");
    assert_eq!(eval("Object.keys([4, 5]).length"), ScriptValue::Number(2.0));
    assert_eq!(script_error("Object.keys(null)").kind, ErrorKind::TypeError);
}

#[test]
fn test_parse_int() {
    assert_eq!(eval("parseInt('42')"), ScriptValue::Number(42.0));
    assert_eq!(eval("parseInt('ff', 16)"), ScriptValue::Number(255.0));
    assert_eq!(eval("parseInt(' 12 apples')"), ScriptValue::Number(12.0));
    assert_eq!(eval("isNaNResult = parseInt('x'); isNaNResult != isNaNResult"), ScriptValue::Boolean(true));
}

#[test]
fn test_seal_makes_values_read_only() {
    assert_eq!(eval("let o = seal({a: 1}); let r; try { o.a = 2; } catch (e) { r = e.name; } r + o.a"), ScriptValue::from("TypeError1"));
    assert_eq!(script_error("let a = seal([1]); a.push(2);").kind, ErrorKind::TypeError);
    assert_eq!(eval("seal(5)"), ScriptValue::Number(5.0));
}

#[test]
fn test_array_methods() {
    assert_eq!(eval("let a = [1]; a.push(2, 3)"), ScriptValue::Number(3.0));
    assert_eq!(eval_str("[1, null, 'x'].join('-')"), "1--x");
    assert_eq!(eval("[5, 6, 7].indexOf(7)"), ScriptValue::Number(2.0));
    assert_eq!(eval("[5, 6, 7].indexOf('7')"), ScriptValue::Number(-1.0));
    assert_eq!(eval_str("[1, 2, 3, 4].slice(1, -1).join()"), "2,3");
    assert_eq!(eval_str("[1, 2, 3].map(x => x * 2).join()"), "2,4,6");
    assert_eq!(eval_str("[1, 2, 3, 4].filter(x => x % 2 == 0).join()"), "2,4");
    assert_eq!(eval("let t = 0; [1, 2, 3].forEach((x, i) => { t += x * i; }); t"), ScriptValue::Number(8.0));
    assert_eq!(eval("[].length"), ScriptValue::Number(0.0));
}

#[test]
fn test_array_element_assignment_pads() {
    assert_eq!(eval("let a = []; a[2] = 'z'; a.length"), ScriptValue::Number(3.0));
    assert_eq!(eval("let a = []; a[2] = 'z'; a[0]"), ScriptValue::Undefined);
}

#[test]
fn test_string_methods() {
    assert_eq!(eval("'hello'.length"), ScriptValue::Number(5.0));
    assert_eq!(eval("'hello'.indexOf('l')"), ScriptValue::Number(2.0));
    assert_eq!(eval("'hello'.indexOf('z')"), ScriptValue::Number(-1.0));
    assert_eq!(eval_str("'hello'.slice(1, 3)"), "el");
    assert_eq!(eval_str("'hello'.slice(-3)"), "llo");
    assert_eq!(eval_str("'a,b,c'.split(',').join('+')"), "a+b+c");
    assert_eq!(eval_str("'abc'.split('').join(' ')"), "a b c");
    assert_eq!(eval_str("'abc'[1]"), "b");
}

#[test]
fn test_string_match() {
    assert_eq!(eval_str("'Function@12'.match('([A-Za-z]+)@(\\\\d+)')[2]"), "12");
    assert_eq!(eval("'abc'.match('z')"), ScriptValue::Null);
    assert_eq!(script_error("'abc'.match('(')").kind, ErrorKind::SyntaxError);
}

#[test]
fn test_out_of_memory_is_catchable() {
    let interpreter = Interpreter::with_options(ContextOptions::default().with_heap_limit(4096));
    let mut ctx = interpreter.create_context().unwrap();
    let source = "
        let caught = false;
        try {
            let s = 'x';
            while (true) { s = s + s; }
        } catch (e) {
            caught = e.name == 'InternalError';
        }
        caught
    ";
    assert_eq!(ctx.evaluate(source, "oom.js", 1, &mut NoHost).unwrap(), ScriptValue::Boolean(true));
}

#[test]
fn test_uncaught_out_of_memory_surfaces_original_error() {
    let interpreter = Interpreter::with_options(ContextOptions::default().with_heap_limit(1024));
    let mut ctx = interpreter.create_context().unwrap();
    let err = ctx
        .evaluate("let a = []; while (true) { a.push(1, 2, 3, 4); }", "oom.js", 1, &mut NoHost)
        .unwrap_err();
    assert!(matches!(err, ProfilerError::OutOfMemory { .. }));
}
