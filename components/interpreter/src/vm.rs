//! Tree-walking evaluator
//!
//! [`Vm`] evaluates one parsed program against a [`ProbeContext`]. It holds
//! the context and the host dispatcher for the duration of a single
//! `evaluate` call, so host operations can allocate result strings in the
//! very context that called them.
//!
//! Control flow that leaves a statement early (`return`, `break`,
//! `continue`) is a [`Completion`]; exceptions travel as [`Abort`] through
//! `Result` so `?` unwinds them to the nearest `try`.

use std::cmp::Ordering;
use std::rc::Rc;

use core_types::{
    ErrorKind, FunctionHandle, FunctionKind, HostFunctions, ProfilerError, ScriptArray,
    ScriptObject, ScriptString, ScriptValue,
};
use parser::{
    AssignmentTarget, BinaryOperator, Expression, ForInOfLeft, ForInit, Function, Literal,
    LogicalOperator, MemberProperty, Program, Statement, UnaryOperator, UpdateOperator,
    VariableKind,
};

use crate::budget::{
    ARRAY_HEADER_SIZE, CLOSURE_SIZE, ELEMENT_SIZE, OBJECT_HEADER_SIZE, PROPERTY_SIZE,
    STRING_HEADER_SIZE,
};
use crate::context::{Closure, ProbeContext};
use crate::exception::{Abort, EvalResult, Thrown};
use crate::format::{number_to_string, to_display_string, to_number};
use crate::scope::{AssignError, Scope};

/// How a statement finished.
#[derive(Debug)]
pub(crate) enum Completion {
    Normal,
    Return(ScriptValue),
    Break,
    Continue,
}

/// A resolved assignment target.
enum Place {
    Binding(String),
    Property(ScriptValue, String),
}

/// Returns the element index named by `key`, if it is a canonical one.
pub(crate) fn array_index(key: &str) -> Option<usize> {
    key.parse::<u32>()
        .ok()
        .filter(|index| index.to_string() == key)
        .map(|index| index as usize)
}

/// Property name a value converts to when used as a key.
pub(crate) fn property_key(value: &ScriptValue) -> String {
    match value {
        ScriptValue::String(s) => s.as_str().to_owned(),
        ScriptValue::Number(n) => number_to_string(*n),
        other => to_display_string(other),
    }
}

fn loose_equals(a: &ScriptValue, b: &ScriptValue) -> bool {
    use ScriptValue::*;
    match (a, b) {
        (Undefined | Null, Undefined | Null) => true,
        (Undefined | Null, _) | (_, Undefined | Null) => false,
        (Number(_), String(_)) | (String(_), Number(_)) | (Boolean(_), _) | (_, Boolean(_)) => {
            to_number(a) == to_number(b)
        }
        (Array(_) | Object(_), Number(_) | String(_)) => {
            loose_equals(&ScriptValue::from(to_display_string(a).as_str()), b)
        }
        (Number(_) | String(_), Array(_) | Object(_)) => loose_equals(b, a),
        _ => a.strict_equals(b),
    }
}

fn compare(a: &ScriptValue, b: &ScriptValue) -> Option<Ordering> {
    match (a, b) {
        (ScriptValue::String(x), ScriptValue::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => to_number(a).partial_cmp(&to_number(b)),
    }
}

fn collect_var_names<'s>(body: &'s [Statement], names: &mut Vec<&'s str>) {
    for statement in body {
        match statement {
            Statement::VariableDeclaration {
                kind: VariableKind::Var,
                declarations,
                ..
            } => names.extend(declarations.iter().map(|d| d.id.as_str())),
            Statement::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                collect_var_names(std::slice::from_ref(&**consequent), names);
                if let Some(alternate) = alternate {
                    collect_var_names(std::slice::from_ref(&**alternate), names);
                }
            }
            Statement::WhileStatement { body, .. } => {
                collect_var_names(std::slice::from_ref(&**body), names)
            }
            Statement::ForStatement { init, body, .. } => {
                if let Some(ForInit::VariableDeclaration {
                    kind: VariableKind::Var,
                    declarations,
                }) = init
                {
                    names.extend(declarations.iter().map(|d| d.id.as_str()));
                }
                collect_var_names(std::slice::from_ref(&**body), names);
            }
            Statement::ForInStatement { left, body, .. }
            | Statement::ForOfStatement { left, body, .. } => {
                if let ForInOfLeft::VariableDeclaration {
                    kind: VariableKind::Var,
                    id,
                } = left
                {
                    names.push(id);
                }
                collect_var_names(std::slice::from_ref(&**body), names);
            }
            Statement::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                collect_var_names(block, names);
                if let Some(handler) = handler {
                    collect_var_names(&handler.body, names);
                }
                if let Some(finalizer) = finalizer {
                    collect_var_names(finalizer, names);
                }
            }
            Statement::BlockStatement { body } => collect_var_names(body, names),
            _ => {}
        }
    }
}

/// Describes a callee for "is not a function" messages.
fn describe_callee(callee: &Expression) -> String {
    match callee {
        Expression::Identifier { name, .. } => name.clone(),
        Expression::MemberExpression {
            object,
            property: MemberProperty::Identifier(name),
            ..
        } => format!("{}.{}", describe_callee(object), name),
        Expression::MemberExpression { object, .. } => format!("{}[...]", describe_callee(object)),
        _ => "expression".to_owned(),
    }
}

/// Line an expression is reported at; literals and empty literals have
/// none of their own and report the first line.
fn expression_line(expression: &Expression) -> u32 {
    match expression {
        Expression::Identifier { line, .. }
        | Expression::UnaryExpression { line, .. }
        | Expression::UpdateExpression { line, .. }
        | Expression::BinaryExpression { line, .. }
        | Expression::AssignmentExpression { line, .. }
        | Expression::MemberExpression { line, .. }
        | Expression::CallExpression { line, .. } => *line,
        Expression::FunctionExpression(function) => function.line,
        Expression::LogicalExpression { left, .. } => expression_line(left),
        Expression::ConditionalExpression { test, .. } => expression_line(test),
        Expression::ArrayExpression { elements } => elements.first().map_or(1, expression_line),
        Expression::ObjectExpression { properties } => {
            properties.first().map_or(1, |(_, value)| expression_line(value))
        }
        Expression::Literal(_) => 1,
    }
}

/// Evaluator state for one `evaluate` call.
pub(crate) struct Vm<'a> {
    pub(crate) ctx: &'a mut ProbeContext,
    pub(crate) host: &'a mut dyn HostFunctions,
    /// Script function calls currently on the stack
    depth: u32,
    /// Expression evaluations currently on the stack
    eval_depth: u32,
    /// Value of the last top-level expression statement
    completion: ScriptValue,
}

impl<'a> Vm<'a> {
    pub(crate) fn new(ctx: &'a mut ProbeContext, host: &'a mut dyn HostFunctions) -> Self {
        Self {
            ctx,
            host,
            depth: 0,
            eval_depth: 0,
            completion: ScriptValue::Undefined,
        }
    }

    /// Run a whole program in the global scope and return its completion
    /// value.
    pub(crate) fn run(mut self, program: &Program) -> EvalResult<ScriptValue> {
        let scope = self.ctx.globals.clone();
        self.hoist(&program.body, &scope)?;
        // Top-level return/break/continue are rejected by the parser.
        self.exec_statements(&program.body, &scope)?;
        Ok(self.completion)
    }

    // ------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------

    pub(crate) fn charge(&mut self, bytes: usize, what: &str, line: u32) -> EvalResult<()> {
        self.ctx
            .budget
            .charge(bytes, what)
            .map_err(|e| Abort::from_host(e, line))
    }

    pub(crate) fn new_string(&mut self, text: String, line: u32) -> EvalResult<ScriptValue> {
        self.charge(STRING_HEADER_SIZE + text.len(), "allocating a string", line)?;
        Ok(ScriptValue::String(ScriptString::from(text)))
    }

    pub(crate) fn new_array(&mut self, elements: Vec<ScriptValue>, line: u32) -> EvalResult<ScriptValue> {
        let bytes = ELEMENT_SIZE
            .saturating_mul(elements.len())
            .saturating_add(ARRAY_HEADER_SIZE);
        self.charge(bytes, "allocating an array", line)?;
        Ok(ScriptValue::Array(ScriptArray::from_vec(elements)))
    }

    fn make_closure(&mut self, function: &Rc<Function>, scope: &Scope) -> EvalResult<ScriptValue> {
        self.charge(CLOSURE_SIZE, "creating a closure", function.line)?;
        let index = u32::try_from(self.ctx.closures.len()).map_err(|_| {
            Abort::from_host(ProfilerError::out_of_memory("creating a closure"), function.line)
        })?;
        self.ctx.closures.push(Closure {
            function: Rc::clone(function),
            scope: scope.clone(),
        });
        let name = function.name.as_deref().unwrap_or("");
        Ok(ScriptValue::Function(FunctionHandle::new(name, FunctionKind::Script(index))))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Declare `var` names and function declarations of a function body or
    /// program before it runs.
    fn hoist(&mut self, body: &[Statement], scope: &Scope) -> EvalResult<()> {
        let mut names = Vec::new();
        collect_var_names(body, &mut names);
        for name in names {
            scope.declare_var(name);
        }
        self.hoist_functions(body, scope)
    }

    fn hoist_functions(&mut self, body: &[Statement], scope: &Scope) -> EvalResult<()> {
        for statement in body {
            if let Statement::FunctionDeclaration(function) = statement {
                let closure = self.make_closure(function, scope)?;
                if let Some(name) = &function.name {
                    scope.declare(name, closure, true);
                }
            }
        }
        Ok(())
    }

    fn exec_statements(&mut self, body: &[Statement], scope: &Scope) -> EvalResult<Completion> {
        for statement in body {
            match self.exec(statement, scope)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_block(&mut self, body: &[Statement], scope: &Scope) -> EvalResult<Completion> {
        let block = scope.block();
        self.hoist_functions(body, &block)?;
        self.exec_statements(body, &block)
    }

    fn declare(&mut self, kind: VariableKind, name: &str, value: Option<ScriptValue>, scope: &Scope, line: u32) -> EvalResult<()> {
        match kind {
            VariableKind::Var => {
                scope.declare_var(name);
                match value {
                    Some(value) => self.assign_binding(name, value, scope, line),
                    None => Ok(()),
                }
            }
            VariableKind::Let => {
                scope.declare(name, value.unwrap_or_default(), true);
                Ok(())
            }
            VariableKind::Const => {
                scope.declare(name, value.unwrap_or_default(), false);
                Ok(())
            }
        }
    }

    fn assign_binding(&mut self, name: &str, value: ScriptValue, scope: &Scope, line: u32) -> EvalResult<()> {
        scope.assign(name, value).map_err(|AssignError::Constant| {
            Abort::error(
                ErrorKind::TypeError,
                format!("assignment to constant variable '{name}'"),
                line,
            )
        })
    }

    fn bind_loop_variable(&mut self, left: &ForInOfLeft, value: ScriptValue, scope: &Scope, line: u32) -> EvalResult<()> {
        match left {
            ForInOfLeft::VariableDeclaration { kind, id } => self.declare(*kind, id, Some(value), scope, line),
            ForInOfLeft::Identifier(name) => self.assign_binding(name, value, scope, line),
        }
    }

    /// Runs a loop body; `None` means keep looping.
    fn loop_body(&mut self, body: &Statement, scope: &Scope) -> EvalResult<Option<Completion>> {
        match self.exec(body, scope)? {
            Completion::Break => Ok(Some(Completion::Normal)),
            Completion::Normal | Completion::Continue => Ok(None),
            ret @ Completion::Return(_) => Ok(Some(ret)),
        }
    }

    fn exec(&mut self, statement: &Statement, scope: &Scope) -> EvalResult<Completion> {
        match statement {
            Statement::VariableDeclaration {
                kind,
                declarations,
                line,
            } => {
                for declarator in declarations {
                    let value = match &declarator.init {
                        Some(init) => Some(self.eval(init, scope)?),
                        None => None,
                    };
                    self.declare(*kind, &declarator.id, value, scope, *line)?;
                }
                Ok(Completion::Normal)
            }
            // Bound by hoisting.
            Statement::FunctionDeclaration(_) => Ok(Completion::Normal),
            Statement::ExpressionStatement { expression, .. } => {
                let value = self.eval(expression, scope)?;
                if self.depth == 0 {
                    self.completion = value;
                }
                Ok(Completion::Normal)
            }
            Statement::ReturnStatement { argument, .. } => {
                let value = match argument {
                    Some(argument) => self.eval(argument, scope)?,
                    None => ScriptValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.exec(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Statement::WhileStatement { test, body } => {
                while self.eval(test, scope)?.is_truthy() {
                    if let Some(done) = self.loop_body(body, scope)? {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::ForStatement {
                init,
                test,
                update,
                body,
            } => {
                let loop_scope = scope.block();
                match init {
                    Some(ForInit::VariableDeclaration { kind, declarations }) => {
                        for declarator in declarations {
                            let value = match &declarator.init {
                                Some(init) => Some(self.eval(init, &loop_scope)?),
                                None => None,
                            };
                            self.declare(*kind, &declarator.id, value, &loop_scope, 0)?;
                        }
                    }
                    Some(ForInit::Expression(expression)) => {
                        self.eval(expression, &loop_scope)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval(test, &loop_scope)?.is_truthy() {
                            break;
                        }
                    }
                    if let Some(done) = self.loop_body(body, &loop_scope)? {
                        return Ok(done);
                    }
                    if let Some(update) = update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::ForInStatement {
                left,
                right,
                body,
                line,
            } => {
                let target = self.eval(right, scope)?;
                let keys = match &target {
                    ScriptValue::Object(obj) => obj.keys(),
                    ScriptValue::Array(arr) => (0..arr.len()).map(|i| i.to_string()).collect(),
                    ScriptValue::String(s) => (0..s.as_str().chars().count()).map(|i| i.to_string()).collect(),
                    _ => Vec::new(),
                };
                for key in keys {
                    let key = self.new_string(key, *line)?;
                    let iteration = scope.block();
                    self.bind_loop_variable(left, key, &iteration, *line)?;
                    if let Some(done) = self.loop_body(body, &iteration)? {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::ForOfStatement {
                left,
                right,
                body,
                line,
            } => {
                let target = self.eval(right, scope)?;
                let values = match &target {
                    ScriptValue::Array(arr) => arr.to_vec(),
                    ScriptValue::String(s) => s
                        .as_str()
                        .chars()
                        .map(|c| ScriptValue::from(c.to_string().as_str()))
                        .collect(),
                    other => {
                        return Err(Abort::error(
                            ErrorKind::TypeError,
                            format!("{} is not iterable", to_display_string(other)),
                            *line,
                        ))
                    }
                };
                for value in values {
                    let iteration = scope.block();
                    self.bind_loop_variable(left, value, &iteration, *line)?;
                    if let Some(done) = self.loop_body(body, &iteration)? {
                        return Ok(done);
                    }
                }
                Ok(Completion::Normal)
            }
            Statement::BreakStatement { .. } => Ok(Completion::Break),
            Statement::ContinueStatement { .. } => Ok(Completion::Continue),
            Statement::ThrowStatement { argument, line } => {
                let value = self.eval(argument, scope)?;
                Err(Abort::Throw(Thrown {
                    value,
                    origin: None,
                    line: *line,
                }))
            }
            Statement::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block(block, scope);
                if let Some(handler) = handler {
                    if let Err(Abort::Throw(thrown)) = result {
                        let catch_scope = scope.block();
                        if let Some(param) = &handler.param {
                            catch_scope.declare(param, thrown.value, true);
                        }
                        result = self.exec_block(&handler.body, &catch_scope);
                    }
                }
                if let Some(finalizer) = finalizer {
                    if matches!(result, Err(Abort::Fatal(_))) {
                        return result;
                    }
                    match self.exec_block(finalizer, scope)? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                result
            }
            Statement::BlockStatement { body } => self.exec_block(body, scope),
            Statement::EmptyStatement => Ok(Completion::Normal),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, expression: &Expression, scope: &Scope) -> EvalResult<ScriptValue> {
        if self.eval_depth >= self.ctx.options.max_eval_depth {
            return Err(Abort::error(ErrorKind::RangeError, "too much recursion", expression_line(expression)));
        }
        self.eval_depth += 1;
        let result = self.eval_expression(expression, scope);
        self.eval_depth -= 1;
        result
    }

    fn eval_expression(&mut self, expression: &Expression, scope: &Scope) -> EvalResult<ScriptValue> {
        match expression {
            Expression::Identifier { name, line } => scope.lookup(name).ok_or_else(|| {
                Abort::error(ErrorKind::ReferenceError, format!("{name} is not defined"), *line)
            }),
            Expression::Literal(literal) => Ok(match literal {
                Literal::Number(n) => ScriptValue::Number(*n),
                Literal::String(s) => ScriptValue::from(s.as_str()),
                Literal::Boolean(b) => ScriptValue::Boolean(*b),
                Literal::Null => ScriptValue::Null,
            }),
            Expression::ArrayExpression { elements } => {
                let values = elements
                    .iter()
                    .map(|element| self.eval(element, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.new_array(values, 0)
            }
            Expression::ObjectExpression { properties } => {
                let bytes = PROPERTY_SIZE
                    .saturating_mul(properties.len())
                    .saturating_add(OBJECT_HEADER_SIZE);
                self.charge(bytes, "allocating an object", 0)?;
                let obj = ScriptObject::new();
                for (key, value) in properties {
                    let value = self.eval(value, scope)?;
                    obj.set(key.as_str(), value);
                }
                Ok(ScriptValue::Object(obj))
            }
            Expression::FunctionExpression(function) => self.make_closure(function, scope),
            Expression::UnaryExpression {
                operator, argument, ..
            } => {
                if let (UnaryOperator::Typeof, Expression::Identifier { name, .. }) = (operator, &**argument) {
                    // typeof tolerates undeclared names.
                    let value = scope.lookup(name).unwrap_or_default();
                    return Ok(ScriptValue::from(value.type_of()));
                }
                let value = self.eval(argument, scope)?;
                Ok(match operator {
                    UnaryOperator::Minus => ScriptValue::Number(-to_number(&value)),
                    UnaryOperator::Plus => ScriptValue::Number(to_number(&value)),
                    UnaryOperator::Not => ScriptValue::Boolean(!value.is_truthy()),
                    UnaryOperator::Typeof => ScriptValue::from(value.type_of()),
                })
            }
            Expression::UpdateExpression {
                operator,
                prefix,
                argument,
                line,
            } => {
                let place = self.resolve(argument, scope)?;
                let old = to_number(&self.read(&place, scope, *line)?);
                let new = match operator {
                    UpdateOperator::Increment => old + 1.0,
                    UpdateOperator::Decrement => old - 1.0,
                };
                self.write(place, ScriptValue::Number(new), scope, *line)?;
                Ok(ScriptValue::Number(if *prefix { new } else { old }))
            }
            Expression::BinaryExpression {
                left,
                operator,
                right,
                line,
            } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*operator, &left, &right, *line)
            }
            Expression::LogicalExpression {
                left,
                operator,
                right,
            } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match operator {
                    LogicalOperator::And => !left.is_truthy(),
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::NullishCoalesce => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expression::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expression::AssignmentExpression {
                operator,
                left,
                right,
                line,
            } => {
                let place = self.resolve(left, scope)?;
                let value = match operator.binary() {
                    None => self.eval(right, scope)?,
                    Some(op) => {
                        let current = self.read(&place, scope, *line)?;
                        let right = self.eval(right, scope)?;
                        self.binary(op, &current, &right, *line)?
                    }
                };
                self.write(place, value.clone(), scope, *line)?;
                Ok(value)
            }
            Expression::MemberExpression {
                object,
                property,
                line,
            } => {
                let object = self.eval(object, scope)?;
                let key = self.property_name(property, scope)?;
                self.get_property(&object, &key, *line)
            }
            Expression::CallExpression {
                callee,
                arguments,
                line,
            } => self.eval_call(callee, arguments, scope, *line),
        }
    }

    fn eval_arguments(&mut self, arguments: &[Expression], scope: &Scope) -> EvalResult<Vec<ScriptValue>> {
        arguments.iter().map(|argument| self.eval(argument, scope)).collect()
    }

    fn eval_call(&mut self, callee: &Expression, arguments: &[Expression], scope: &Scope, line: u32) -> EvalResult<ScriptValue> {
        let function = match callee {
            Expression::MemberExpression { object, property, .. } => {
                let receiver = self.eval(object, scope)?;
                let key = self.property_name(property, scope)?;
                if matches!(receiver, ScriptValue::Array(_) | ScriptValue::String(_)) {
                    let args = self.eval_arguments(arguments, scope)?;
                    return self.call_method(&receiver, &key, args, line);
                }
                self.get_property(&receiver, &key, line)?
            }
            other => self.eval(other, scope)?,
        };
        if !matches!(function, ScriptValue::Function(_)) {
            return Err(Abort::error(
                ErrorKind::TypeError,
                format!("{} is not a function", describe_callee(callee)),
                line,
            ));
        }
        let args = self.eval_arguments(arguments, scope)?;
        self.call_value(&function, &args, line)
    }

    /// Call any callable value.
    pub(crate) fn call_value(&mut self, function: &ScriptValue, args: &[ScriptValue], line: u32) -> EvalResult<ScriptValue> {
        let ScriptValue::Function(handle) = function else {
            return Err(Abort::error(
                ErrorKind::TypeError,
                format!("{} is not a function", to_display_string(function)),
                line,
            ));
        };
        match handle.kind() {
            FunctionKind::Host => {
                tracing::trace!(operation = handle.name(), args = args.len(), "host call");
                let result = self
                    .host
                    .call(&mut *self.ctx, handle.name(), args)
                    .map_err(|e| Abort::from_host(e, line))?;
                self.ctx
                    .budget
                    .charge_value(&result)
                    .map_err(|e| Abort::from_host(e, line))?;
                Ok(result)
            }
            FunctionKind::Builtin(id) => self.call_builtin(id, args, line),
            FunctionKind::Native(index) => {
                let native = self.ctx.natives.get(index as usize).cloned().ok_or_else(|| {
                    Abort::Fatal(ProfilerError::setup(format!("unknown native function {}", handle.name())))
                })?;
                native(args).map_err(|e| Abort::from_host(e, line))
            }
            FunctionKind::Script(index) => self.call_closure(index, args, line),
        }
    }

    fn call_closure(&mut self, index: u32, args: &[ScriptValue], line: u32) -> EvalResult<ScriptValue> {
        if self.depth >= self.ctx.options.max_call_depth {
            return Err(Abort::error(ErrorKind::RangeError, "too much recursion", line));
        }
        let closure = self.ctx.closures.get(index as usize).cloned().ok_or_else(|| {
            Abort::Fatal(ProfilerError::setup(format!("unknown script function #{index}")))
        })?;
        let scope = closure.scope.function();
        for (i, param) in closure.function.params.iter().enumerate() {
            scope.declare(param, args.get(i).cloned().unwrap_or_default(), true);
        }
        self.hoist(&closure.function.body, &scope)?;
        self.depth += 1;
        let result = self.exec_statements(&closure.function.body, &scope);
        self.depth -= 1;
        match result? {
            Completion::Return(value) => Ok(value),
            _ => Ok(ScriptValue::Undefined),
        }
    }

    fn binary(&mut self, operator: BinaryOperator, left: &ScriptValue, right: &ScriptValue, line: u32) -> EvalResult<ScriptValue> {
        let number = |f: fn(f64, f64) -> f64| -> EvalResult<ScriptValue> {
            Ok(ScriptValue::Number(f(to_number(left), to_number(right))))
        };
        let ordered = |accept: fn(Ordering) -> bool| -> EvalResult<ScriptValue> {
            Ok(ScriptValue::Boolean(compare(left, right).is_some_and(accept)))
        };
        match operator {
            BinaryOperator::Add => {
                let textual = |v: &ScriptValue| {
                    matches!(
                        v,
                        ScriptValue::String(_) | ScriptValue::Array(_) | ScriptValue::Object(_) | ScriptValue::Function(_)
                    )
                };
                if textual(left) || textual(right) {
                    let mut text = to_display_string(left);
                    text.push_str(&to_display_string(right));
                    self.new_string(text, line)
                } else {
                    number(|a, b| a + b)
                }
            }
            BinaryOperator::Sub => number(|a, b| a - b),
            BinaryOperator::Mul => number(|a, b| a * b),
            BinaryOperator::Div => number(|a, b| a / b),
            BinaryOperator::Mod => number(|a, b| a % b),
            BinaryOperator::Eq => Ok(ScriptValue::Boolean(loose_equals(left, right))),
            BinaryOperator::NotEq => Ok(ScriptValue::Boolean(!loose_equals(left, right))),
            BinaryOperator::StrictEq => Ok(ScriptValue::Boolean(left.strict_equals(right))),
            BinaryOperator::StrictNotEq => Ok(ScriptValue::Boolean(!left.strict_equals(right))),
            BinaryOperator::Lt => ordered(|o| o == Ordering::Less),
            BinaryOperator::LtEq => ordered(|o| o != Ordering::Greater),
            BinaryOperator::Gt => ordered(|o| o == Ordering::Greater),
            BinaryOperator::GtEq => ordered(|o| o != Ordering::Less),
            BinaryOperator::In => {
                let key = property_key(left);
                let found = match right {
                    ScriptValue::Object(obj) => obj.contains_key(&key),
                    ScriptValue::Array(arr) => key == "length" || array_index(&key).is_some_and(|i| i < arr.len()),
                    other => {
                        return Err(Abort::error(
                            ErrorKind::TypeError,
                            format!("cannot use 'in' to search for '{key}' in {}", to_display_string(other)),
                            line,
                        ))
                    }
                };
                Ok(ScriptValue::Boolean(found))
            }
        }
    }

    // ------------------------------------------------------------------
    // Properties and assignment targets
    // ------------------------------------------------------------------

    fn property_name(&mut self, property: &MemberProperty, scope: &Scope) -> EvalResult<String> {
        match property {
            MemberProperty::Identifier(name) => Ok(name.clone()),
            MemberProperty::Computed(expression) => Ok(property_key(&self.eval(expression, scope)?)),
        }
    }

    pub(crate) fn get_property(&mut self, object: &ScriptValue, key: &str, line: u32) -> EvalResult<ScriptValue> {
        Ok(match object {
            ScriptValue::Undefined | ScriptValue::Null => {
                return Err(Abort::error(
                    ErrorKind::TypeError,
                    format!("cannot read property '{key}' of {}", to_display_string(object)),
                    line,
                ))
            }
            ScriptValue::Object(obj) => obj.get(key).unwrap_or_default(),
            ScriptValue::Array(arr) => match key {
                "length" => ScriptValue::Number(arr.len() as f64),
                _ => array_index(key).and_then(|i| arr.get(i)).unwrap_or_default(),
            },
            ScriptValue::String(s) => match key {
                "length" => ScriptValue::Number(s.as_str().chars().count() as f64),
                _ => array_index(key)
                    .and_then(|i| s.as_str().chars().nth(i))
                    .map(|c| ScriptValue::from(c.to_string().as_str()))
                    .unwrap_or_default(),
            },
            ScriptValue::Function(f) if key == "name" => ScriptValue::from(f.name()),
            _ => ScriptValue::Undefined,
        })
    }

    fn set_property(&mut self, object: &ScriptValue, key: &str, value: ScriptValue, line: u32) -> EvalResult<()> {
        let read_only = || {
            Abort::error(
                ErrorKind::TypeError,
                format!("cannot assign to read-only property '{key}'"),
                line,
            )
        };
        match object {
            ScriptValue::Undefined | ScriptValue::Null => Err(Abort::error(
                ErrorKind::TypeError,
                format!("cannot set property '{key}' of {}", to_display_string(object)),
                line,
            )),
            ScriptValue::Object(obj) => {
                if obj.is_sealed() {
                    return Err(read_only());
                }
                if !obj.contains_key(key) {
                    self.charge(PROPERTY_SIZE, "adding a property", line)?;
                }
                obj.set(key, value);
                Ok(())
            }
            ScriptValue::Array(arr) => {
                let Some(index) = array_index(key) else {
                    return Err(Abort::error(
                        ErrorKind::TypeError,
                        format!("cannot set property '{key}' of an array"),
                        line,
                    ));
                };
                if arr.is_sealed() {
                    return Err(read_only());
                }
                let growth = (index + 1).saturating_sub(arr.len());
                self.charge(ELEMENT_SIZE.saturating_mul(growth), "growing an array", line)?;
                arr.set(index, value);
                Ok(())
            }
            // Writes to primitives are dropped.
            _ => Ok(()),
        }
    }

    fn resolve(&mut self, target: &AssignmentTarget, scope: &Scope) -> EvalResult<Place> {
        match target {
            AssignmentTarget::Identifier(name) => Ok(Place::Binding(name.clone())),
            AssignmentTarget::Member { object, property } => {
                let object = self.eval(object, scope)?;
                let key = self.property_name(property, scope)?;
                Ok(Place::Property(object, key))
            }
        }
    }

    fn read(&mut self, place: &Place, scope: &Scope, line: u32) -> EvalResult<ScriptValue> {
        match place {
            Place::Binding(name) => scope.lookup(name).ok_or_else(|| {
                Abort::error(ErrorKind::ReferenceError, format!("{name} is not defined"), line)
            }),
            Place::Property(object, key) => self.get_property(object, key, line),
        }
    }

    fn write(&mut self, place: Place, value: ScriptValue, scope: &Scope, line: u32) -> EvalResult<()> {
        match place {
            Place::Binding(name) => self.assign_binding(&name, value, scope, line),
            Place::Property(object, key) => self.set_property(&object, &key, value, line),
        }
    }
}
