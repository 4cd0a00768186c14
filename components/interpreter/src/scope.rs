//! Lexical environments
//!
//! Scopes form a parent chain shared through `Rc`, so a closure keeps its
//! defining scope alive after the block that created it has finished.
//! Function scopes (and the global scope) are where `var` declarations and
//! implicit globals land.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use core_types::ScriptValue;

#[derive(Debug)]
struct Binding {
    value: ScriptValue,
    mutable: bool,
}

#[derive(Debug)]
struct ScopeData {
    bindings: RefCell<HashMap<String, Binding>>,
    parent: Option<Scope>,
    function_scope: bool,
}

/// Why an assignment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    /// The binding was declared `const`
    Constant,
}

/// A shared handle to one environment in the scope chain.
#[derive(Debug, Clone)]
pub struct Scope(Rc<ScopeData>);

impl Scope {
    fn with_parent(parent: Option<Scope>, function_scope: bool) -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(HashMap::new()),
            parent,
            function_scope,
        }))
    }

    /// Create a global scope.
    pub fn global() -> Self {
        Self::with_parent(None, true)
    }

    /// Create a block scope nested in this one.
    pub fn block(&self) -> Self {
        Self::with_parent(Some(self.clone()), false)
    }

    /// Create a function-body scope nested in this one.
    pub fn function(&self) -> Self {
        Self::with_parent(Some(self.clone()), true)
    }

    /// Declare `name` in this scope, replacing any earlier binding here.
    pub fn declare(&self, name: &str, value: ScriptValue, mutable: bool) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.to_owned(), Binding { value, mutable });
    }

    /// Declare a `var` binding in the nearest function scope. An existing
    /// binding keeps its value.
    pub fn declare_var(&self, name: &str) {
        let target = self.nearest_function_scope();
        let mut bindings = target.0.bindings.borrow_mut();
        bindings.entry(name.to_owned()).or_insert(Binding {
            value: ScriptValue::Undefined,
            mutable: true,
        });
    }

    /// Resolve `name` through the chain.
    pub fn lookup(&self, name: &str) -> Option<ScriptValue> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(binding) = current.0.bindings.borrow().get(name) {
                return Some(binding.value.clone());
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    /// Assign to the nearest binding of `name`. An unresolved name becomes a
    /// global.
    pub fn assign(&self, name: &str, value: ScriptValue) -> Result<(), AssignError> {
        let mut scope = self;
        loop {
            {
                let mut bindings = scope.0.bindings.borrow_mut();
                if let Some(binding) = bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(AssignError::Constant);
                    }
                    binding.value = value;
                    return Ok(());
                }
            }
            match &scope.0.parent {
                Some(parent) => scope = parent,
                None => {
                    scope.declare(name, value, true);
                    return Ok(());
                }
            }
        }
    }

    /// Returns true if `name` is bound anywhere in the chain.
    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn nearest_function_scope(&self) -> &Scope {
        let mut scope = self;
        while !scope.0.function_scope {
            match &scope.0.parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }
}
