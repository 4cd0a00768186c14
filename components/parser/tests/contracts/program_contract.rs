//! Contract tests for whole-program parsing

use parser::{parse, Expression, MemberProperty, Statement};

#[test]
fn test_function_declaration_records_line() {
    let program = parse("\n\nfunction visit(id) {\n  return getObjectInfo(id);\n}").unwrap();
    let Statement::FunctionDeclaration(function) = &program.body[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(function.name.as_deref(), Some("visit"));
    assert_eq!(function.params, vec!["id".to_string()]);
    assert_eq!(function.line, 3);
}

#[test]
fn test_member_chain_and_call() {
    let program = parse("getObjectInfo(1).children.length;").unwrap();
    let Statement::ExpressionStatement { expression, .. } = &program.body[0] else {
        panic!("expected expression statement");
    };
    let Expression::MemberExpression { object, property, .. } = expression else {
        panic!("expected member expression");
    };
    assert_eq!(*property, MemberProperty::Identifier("length".into()));
    assert!(matches!(**object, Expression::MemberExpression { .. }));
}

#[test]
fn test_computed_member_and_keyword_property() {
    let program = parse("table[id].catch;").unwrap();
    let Statement::ExpressionStatement { expression, .. } = &program.body[0] else {
        panic!("expected expression statement");
    };
    let Expression::MemberExpression { object, property, .. } = expression else {
        panic!("expected member expression");
    };
    assert_eq!(*property, MemberProperty::Identifier("catch".into()));
    assert!(matches!(
        **object,
        Expression::MemberExpression {
            property: MemberProperty::Computed(_),
            ..
        }
    ));
}

#[test]
fn test_probe_script_parses() {
    let source = r#"
        var seen = {};
        var count = 0;
        function visit(id) {
            if (seen[id]) return;
            seen[id] = true;
            count++;
            var info = getObjectInfo(id);
            for (var child of info.children) visit(child);
        }
        for (const root of getGCRoots()) {
            try { visit(root); } catch (e) { print(e.message); }
        }
        count === Object.keys(getObjectTable()).length ? "ok" : "mismatch";
    "#;
    let program = parse(source).unwrap();
    assert_eq!(program.body.len(), 5);
}

#[test]
fn test_syntax_error_has_line() {
    let err = parse("var a = 1;\nvar b = (2;\n").unwrap_err();
    assert_eq!(err.line, 2);
}
