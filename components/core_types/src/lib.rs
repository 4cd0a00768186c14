//! Shared vocabulary for the heap profiler workspace.
//!
//! This crate sits between the profiler core and the two runtimes it talks
//! to. It owns the types that cross those boundaries and nothing else:
//!
//! - [`HeapRef`] / [`ObjectId`] - opaque target handles and the small
//!   integer ids handed to profiling script
//! - [`TargetValue`] / [`TargetString`] - values as the target runtime
//!   reports them
//! - [`ScriptValue`] / [`ScriptString`] - values living in a profiling
//!   context
//! - [`ProfilerError`] / [`ScriptError`] - the error taxonomy
//! - [`runtime`] - the capability traits the profiler consumes
//!
//! # Examples
//!
//! ```
//! use core_types::{ObjectId, ScriptValue, ScriptString};
//!
//! let id = ObjectId::new(7);
//! assert!(!id.is_none());
//! assert!(ObjectId::NONE.is_none());
//!
//! let value = ScriptValue::String(ScriptString::from("Object"));
//! assert_eq!(value.type_of(), "string");
//! assert!(value.is_truthy());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod id;
pub mod runtime;
mod source;
mod value;

pub use error::{ErrorKind, ProfilerError, ProfilerResult, ScriptError};
pub use id::{HeapRef, ObjectId};
pub use runtime::{
    ClassInfo, FunctionInfo, GcRoot, GcThing, HostFunctions, ProfilingContext, ProfilingRuntime,
    PropertyKey, RootMapControl, StringFactory, TargetRuntime, TraceKind, Tracer, WrapperLinks,
};
pub use source::{ScriptInfo, SourceLocation};
pub use value::{
    FunctionHandle, FunctionKind, ScriptArray, ScriptObject, ScriptString, ScriptValue,
    StringIdentity, TargetString, TargetValue,
};
