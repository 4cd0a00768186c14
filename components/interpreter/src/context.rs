//! Profiling contexts
//!
//! A [`ProbeContext`] owns a global scope, the closures created by its
//! scripts and an allocation budget. Nothing in it is shared with the target
//! heap or with other contexts; dropping it releases everything it roots.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use core_types::{
    FunctionHandle, FunctionKind, HostFunctions, ProfilerError, ProfilerResult, ProfilingContext,
    ScriptString, ScriptValue, StringFactory,
};
use parser::{Function, Parser};

use crate::budget::{AllocationBudget, STRING_HEADER_SIZE};
use crate::builtins::install_globals;
use crate::exception::Abort;
use crate::scope::Scope;
use crate::vm::Vm;

/// A function the embedder installs into every context.
pub type NativeFn = Rc<dyn Fn(&[ScriptValue]) -> ProfilerResult<ScriptValue>>;

/// Receives each line written by `print`.
pub type PrintHandler = Rc<dyn Fn(&str)>;

/// Limits applied to each context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Bytes a context may allocate over its lifetime
    pub heap_limit: usize,
    /// Maximum nesting of script function calls
    pub max_call_depth: u32,
    /// Maximum syntactic nesting accepted by the parser
    pub max_nesting_depth: u32,
    /// Maximum nesting of expression evaluation, across calls
    pub max_eval_depth: u32,
    /// Bytes charged for each external string header
    pub external_string_overhead: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            heap_limit: 8 * 1024 * 1024,
            max_call_depth: 128,
            max_nesting_depth: parser::DEFAULT_MAX_NESTING,
            max_eval_depth: 1024,
            external_string_overhead: 24,
        }
    }
}

impl ContextOptions {
    /// Set the allocation budget.
    pub fn with_heap_limit(mut self, bytes: usize) -> Self {
        self.heap_limit = bytes;
        self
    }

    /// Set the call depth limit.
    pub fn with_max_call_depth(mut self, depth: u32) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the syntactic nesting limit.
    pub fn with_max_nesting_depth(mut self, depth: u32) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Set the evaluation nesting limit.
    pub fn with_max_eval_depth(mut self, depth: u32) -> Self {
        self.max_eval_depth = depth;
        self
    }
}

/// A script function together with the scope it closes over.
#[derive(Debug, Clone)]
pub(crate) struct Closure {
    pub(crate) function: Rc<Function>,
    pub(crate) scope: Scope,
}

/// An isolated evaluation context of the reference runtime.
pub struct ProbeContext {
    pub(crate) globals: Scope,
    pub(crate) closures: Vec<Closure>,
    pub(crate) natives: Vec<NativeFn>,
    pub(crate) budget: AllocationBudget,
    pub(crate) options: ContextOptions,
    pub(crate) print: PrintHandler,
}

impl ProbeContext {
    pub(crate) fn new(
        options: ContextOptions,
        natives: &[(String, NativeFn)],
        print: PrintHandler,
    ) -> ProfilerResult<Self> {
        let globals = Scope::global();
        install_globals(&globals);
        let index = |i: usize| {
            u32::try_from(i).map_err(|_| ProfilerError::setup("too many native functions"))
        };
        for (i, (name, _)) in natives.iter().enumerate() {
            let handle = FunctionHandle::new(name, FunctionKind::Native(index(i)?));
            globals.declare(name, ScriptValue::Function(handle), true);
        }
        tracing::debug!(
            heap_limit = options.heap_limit,
            natives = natives.len(),
            "created profiling context"
        );
        Ok(Self {
            globals,
            closures: Vec::new(),
            natives: natives.iter().map(|(_, f)| Rc::clone(f)).collect(),
            budget: AllocationBudget::new(options.heap_limit),
            options,
            print,
        })
    }

    /// Limits this context was created with.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// Bytes charged against the allocation budget so far.
    pub fn bytes_used(&self) -> usize {
        self.budget.used()
    }

    /// Current value of a global binding.
    pub fn global(&self, name: &str) -> Option<ScriptValue> {
        self.globals.lookup(name)
    }
}

impl fmt::Debug for ProbeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeContext")
            .field("closures", &self.closures.len())
            .field("natives", &self.natives.len())
            .field("budget", &self.budget)
            .finish()
    }
}

impl StringFactory for ProbeContext {
    fn external_string(&mut self, chars: &Arc<str>) -> ProfilerResult<ScriptString> {
        self.budget
            .charge(self.options.external_string_overhead, "creating an external string")?;
        Ok(ScriptString::external(Arc::clone(chars)))
    }

    fn new_string(&mut self, chars: &str) -> ProfilerResult<ScriptString> {
        self.budget
            .charge(STRING_HEADER_SIZE + chars.len(), "allocating a string")?;
        Ok(ScriptString::owned(chars))
    }
}

impl ProfilingContext for ProbeContext {
    fn define_host_function(&mut self, name: &str) -> ProfilerResult<()> {
        let handle = FunctionHandle::new(name, FunctionKind::Host);
        self.globals.declare(name, ScriptValue::Function(handle), true);
        Ok(())
    }

    fn define_global(&mut self, name: &str, value: ScriptValue) -> ProfilerResult<()> {
        self.budget.charge_value(&value)?;
        self.globals.declare(name, value, true);
        Ok(())
    }

    fn evaluate(
        &mut self,
        source: &str,
        filename: &str,
        line: u32,
        host: &mut dyn HostFunctions,
    ) -> ProfilerResult<ScriptValue> {
        let program = Parser::new(source)
            .with_max_nesting(self.options.max_nesting_depth)
            .parse()
            .map_err(|e| e.into_script_error(filename, line))?;
        tracing::debug!(filename, line, statements = program.body.len(), "evaluating script");
        match Vm::new(self, host).run(&program) {
            Ok(value) => Ok(value),
            Err(Abort::Throw(thrown)) => Err(thrown.into_profiler_error(filename, line)),
            Err(Abort::Fatal(error)) => Err(error),
        }
    }
}
