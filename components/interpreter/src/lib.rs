//! Reference profiling runtime
//!
//! A tree-walking interpreter for the probe language, implementing
//! [`core_types::ProfilingRuntime`]. Each context it creates has:
//! - Its own global scope, preloaded with `print`, `parseInt`, `seal`,
//!   `JSON.stringify` and `Object.keys`
//! - An allocation budget; exhausting it raises a catchable out-of-memory
//!   error
//! - Zero-copy external strings aliasing target-owned characters
//! - Host functions dispatched to the caller's [`core_types::HostFunctions`]
//!
//! # Example
//!
//! ```
//! use core_types::{
//!     ProfilerError, ProfilerResult, ProfilingContext, ProfilingRuntime, ScriptValue,
//!     StringFactory, HostFunctions,
//! };
//! use interpreter::Interpreter;
//!
//! struct Roots;
//!
//! impl HostFunctions for Roots {
//!     fn call(
//!         &mut self,
//!         _strings: &mut dyn StringFactory,
//!         name: &str,
//!         _args: &[ScriptValue],
//!     ) -> ProfilerResult<ScriptValue> {
//!         match name {
//!             "rootCount" => Ok(ScriptValue::Number(3.0)),
//!             other => Err(ProfilerError::usage(format!("unknown operation {other}"))),
//!         }
//!     }
//! }
//!
//! let mut ctx = Interpreter::new().create_context().unwrap();
//! ctx.define_host_function("rootCount").unwrap();
//! let result = ctx.evaluate("rootCount() * 2", "probe.js", 1, &mut Roots).unwrap();
//! assert_eq!(result, ScriptValue::Number(6.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod budget;
pub mod builtins;
pub mod context;
mod exception;
pub mod format;
mod scope;
mod vm;

use std::fmt;
use std::rc::Rc;

use core_types::{ProfilerResult, ProfilingRuntime, ScriptValue};

pub use budget::AllocationBudget;
pub use builtins::Builtin;
pub use context::{ContextOptions, NativeFn, PrintHandler, ProbeContext};

/// Factory for [`ProbeContext`]s.
///
/// Natives registered with [`with_native`](Self::with_native) are bound as
/// globals in every context the interpreter creates.
#[derive(Clone)]
pub struct Interpreter {
    options: ContextOptions,
    natives: Vec<(String, NativeFn)>,
    print: PrintHandler,
}

impl Interpreter {
    /// Create an interpreter with default limits that prints to stdout.
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    /// Create an interpreter with the given limits.
    pub fn with_options(options: ContextOptions) -> Self {
        Self {
            options,
            natives: Vec::new(),
            print: Rc::new(|line: &str| println!("{line}")),
        }
    }

    /// Install a native global function into every new context.
    pub fn with_native(
        mut self,
        name: impl Into<String>,
        native: impl Fn(&[ScriptValue]) -> ProfilerResult<ScriptValue> + 'static,
    ) -> Self {
        self.natives.push((name.into(), Rc::new(native)));
        self
    }

    /// Route `print` output to `handler` instead of stdout.
    pub fn with_print_handler(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.print = Rc::new(handler);
        self
    }

    /// Limits applied to new contexts.
    pub fn options(&self) -> &ContextOptions {
        &self.options
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("options", &self.options)
            .field("natives", &self.natives.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .finish()
    }
}

impl ProfilingRuntime for Interpreter {
    type Context = ProbeContext;

    fn create_context(&self) -> ProfilerResult<ProbeContext> {
        ProbeContext::new(self.options, &self.natives, Rc::clone(&self.print))
    }
}
