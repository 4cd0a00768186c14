//! Capabilities the profiler consumes from its two runtimes.
//!
//! The *target* runtime owns the heap being inspected and is reached only
//! through [`TargetRuntime`]. The *profiling* runtime hosts the script that
//! does the inspecting and is reached through [`ProfilingRuntime`] and
//! [`ProfilingContext`]. Neither is implemented here.
//!
//! ```text
//! ┌───────────────────┐  HeapRef / TargetValue  ┌───────────────────┐
//! │  target runtime   │────────────────────────▶│  memory_profiler  │
//! │  (TargetRuntime)  │                         │  ids + mirror     │
//! └───────────────────┘                         └─────────┬─────────┘
//!                                  ObjectId / ScriptString│
//!                                                         ▼
//!                                               ┌───────────────────┐
//!                                               │ profiling context │
//!                                               └───────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use crate::{HeapRef, ProfilerResult, ScriptInfo, ScriptString, ScriptValue, TargetString, TargetValue};

/// Kind of a thing reported to a [`Tracer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// A heap object
    Object,
    /// A string
    String,
    /// A boxed number
    Double,
}

/// A garbage-collected thing reported by the tracing callbacks.
#[derive(Debug, Clone)]
pub enum GcThing {
    /// A heap object
    Object(HeapRef),
    /// A string
    String(TargetString),
    /// A boxed number
    Double(f64),
}

impl GcThing {
    /// Kind of this thing.
    pub fn kind(&self) -> TraceKind {
        match self {
            GcThing::Object(_) => TraceKind::Object,
            GcThing::String(_) => TraceKind::String,
            GcThing::Double(_) => TraceKind::Double,
        }
    }

    /// Returns the object handle for object things.
    pub fn as_object(&self) -> Option<HeapRef> {
        match self {
            GcThing::Object(r) => Some(*r),
            _ => None,
        }
    }
}

/// Callback invoked once per traced edge.
///
/// Closures taking a [`GcThing`] are tracers too.
pub trait Tracer {
    /// Called for every thing reachable through the traced edge.
    fn trace(&mut self, thing: GcThing);
}

impl<F: FnMut(GcThing)> Tracer for F {
    fn trace(&mut self, thing: GcThing) {
        self(thing)
    }
}

/// A GC root as enumerated by [`TargetRuntime::map_gc_roots`].
#[derive(Debug, Clone)]
pub struct GcRoot<'a> {
    /// The rooted thing
    pub thing: GcThing,
    /// Debug name the root was registered under
    pub name: Option<&'a str>,
}

/// Whether root enumeration continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootMapControl {
    /// Visit the next root
    Next,
    /// Stop enumerating
    Stop,
}

/// The native class of a target object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInfo<'a> {
    /// Class name (`Object`, `Function`, `XPCWrappedNative`, ...)
    pub name: &'a str,
    /// Extended classes may wrap, or be wrapped by, other objects
    pub extended: bool,
}

/// Metadata of a callable target object.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    /// Declared name; `None` for anonymous functions
    pub name: Option<TargetString>,
    /// Size of the function object itself in bytes
    pub size: usize,
    /// Compiled script; `None` for natively implemented functions
    pub script: Option<ScriptInfo>,
}

/// Wrapper relationships of an extended-class object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapperLinks {
    /// Object this wrapper stands in for
    pub wrapped: Option<HeapRef>,
    /// Outer object of a split object pair
    pub outer: Option<HeapRef>,
    /// Inner object of a split object pair
    pub inner: Option<HeapRef>,
}

/// A property key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// A named property
    Name(Arc<str>),
    /// An indexed element
    Index(u32),
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Name(name) => f.write_str(name),
            PropertyKey::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::Name(Arc::from(name))
    }
}

/// Introspection capabilities of the runtime whose heap is profiled.
///
/// All methods take `&self`: the profiler never mutates the target heap.
/// Handles passed in are ones the same runtime reported through tracing.
pub trait TargetRuntime {
    /// Reports every thing in the full root set to `tracer`.
    fn trace_roots(&self, tracer: &mut dyn Tracer);

    /// Reports every immediate child of `object` to `tracer`.
    fn trace_children(&self, object: HeapRef, tracer: &mut dyn Tracer);

    /// Enumerates registered GC roots until `visit` returns
    /// [`RootMapControl::Stop`].
    fn map_gc_roots(&self, visit: &mut dyn FnMut(GcRoot<'_>) -> RootMapControl);

    /// Native class of `object`, if the runtime reports one.
    fn class_of(&self, object: HeapRef) -> Option<ClassInfo<'_>>;

    /// Total size of `object` in bytes.
    fn object_size(&self, object: HeapRef) -> usize;

    /// Parent (scope) object.
    fn parent_of(&self, object: HeapRef) -> Option<HeapRef>;

    /// Prototype object.
    fn prototype_of(&self, object: HeapRef) -> Option<HeapRef>;

    /// Returns true if `object` can be called.
    fn is_callable(&self, object: HeapRef) -> bool;

    /// Function metadata for callable objects.
    fn function_info(&self, object: HeapRef) -> Option<FunctionInfo>;

    /// Wrapper links; only meaningful for extended classes.
    fn wrapper_links(&self, object: HeapRef) -> WrapperLinks;

    /// Looks up `name` without invoking getters or resolving lazily
    /// defined properties. `Ok(None)` means the property does not exist.
    fn lookup_property(&self, object: HeapRef, name: &str) -> ProfilerResult<Option<TargetValue>>;

    /// Standard enumeration: own and inherited enumerable keys.
    fn enumerate_keys(&self, object: HeapRef) -> ProfilerResult<Vec<PropertyKey>>;

    /// Low-level iteration over every own property, enumerable or not.
    fn property_entries(&self, object: HeapRef) -> ProfilerResult<Vec<(PropertyKey, TargetValue)>>;
}

/// String allocation in a profiling context.
pub trait StringFactory {
    /// Wraps target-owned characters as an external string without copying.
    ///
    /// The caller guarantees `chars` stays valid and unmoved for as long as
    /// the returned string can be reached.
    fn external_string(&mut self, chars: &Arc<str>) -> ProfilerResult<ScriptString>;

    /// Allocates a string that owns a copy of `chars`.
    fn new_string(&mut self, chars: &str) -> ProfilerResult<ScriptString>;
}

/// Operations a profiling context can call back into.
pub trait HostFunctions {
    /// Invokes the host operation `name`.
    ///
    /// `strings` is the calling context's allocator, for results that carry
    /// strings. Non-fatal errors are thrown into script; fatal ones abort
    /// evaluation.
    fn call(
        &mut self,
        strings: &mut dyn StringFactory,
        name: &str,
        args: &[ScriptValue],
    ) -> ProfilerResult<ScriptValue>;
}

/// An isolated execution context with its own heap.
///
/// Dropping the context destroys it along with everything it roots.
pub trait ProfilingContext: StringFactory {
    /// Binds `name` in the global scope to the host operation of that name.
    fn define_host_function(&mut self, name: &str) -> ProfilerResult<()>;

    /// Binds `name` in the global scope to `value`.
    fn define_global(&mut self, name: &str, value: ScriptValue) -> ProfilerResult<()>;

    /// Evaluates `source`, attributing errors to `filename` starting at
    /// `line`. Host operations are dispatched to `host`.
    fn evaluate(
        &mut self,
        source: &str,
        filename: &str,
        line: u32,
        host: &mut dyn HostFunctions,
    ) -> ProfilerResult<ScriptValue>;
}

/// Factory for isolated profiling contexts.
pub trait ProfilingRuntime {
    /// Context type produced by this runtime
    type Context: ProfilingContext;

    /// Creates a fresh context that shares nothing with the target heap.
    fn create_context(&self) -> ProfilerResult<Self::Context>;
}
