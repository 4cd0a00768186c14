//! One-shot heap profiling.
//!
//! A profiling invocation walks every object reachable from the target
//! runtime's roots, numbers them `1..=N`, and then runs a profiling script in
//! a separate, isolated context. The script inspects the heap through host
//! operations that speak only in those numbers and in mirrored strings:
//!
//! - [`IdentifierTable`] - the `HeapRef` / [`ObjectId`](core_types::ObjectId)
//!   bijection built by the walk
//! - [`StringMirror`] - zero-copy, deduplicated target strings
//! - [`HeapWalker`] / [`Inspector`] - child tracing and read-only queries
//! - [`SessionBindings`] - the script-facing operations
//! - [`ProfilingSession`] / [`MemoryProfiler`] - lifecycle and the
//!   one-session-at-a-time rule
//!
//! # Examples
//!
//! ```
//! use interpreter::Interpreter;
//! use memory_manager::Heap;
//! use memory_profiler::{MemoryProfiler, ProfileRequest, ProfileValue};
//!
//! let mut heap = Heap::new();
//! let root = heap.allocate_plain();
//! let child = heap.allocate_plain();
//! heap.set_property(root, "child", child.into()).unwrap();
//! heap.add_object_root(root, "root").unwrap();
//!
//! let profiler = MemoryProfiler::new();
//! let request = ProfileRequest::new("Object.keys(getObjectTable()).length", "count.js");
//! let value = profiler.profile(&heap, &Interpreter::new(), &request).unwrap();
//! assert_eq!(value, ProfileValue::Number(2.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bindings;
pub mod config;
pub mod descriptor;
pub mod id_table;
pub mod inspector;
pub mod profiler;
pub mod session;
pub mod string_mirror;
pub mod walker;

pub use bindings::{SessionBindings, CORE_OPERATIONS, HELPER_OPERATIONS};
pub use config::ProfilerConfig;
pub use descriptor::{
    ClassTally, FunctionMetadata, ObjectDescriptor, PropertyValue, SessionOutcome, SessionStats,
    WrapperDescriptor,
};
pub use id_table::IdentifierTable;
pub use inspector::Inspector;
pub use profiler::{profile_memory, MemoryProfiler};
pub use session::{ProfileRequest, ProfileValue, ProfilingSession, SessionState};
pub use string_mirror::StringMirror;
pub use walker::HeapWalker;
