//! Memory Manager - reference target heap for the profiler
//!
//! This component provides:
//! - An arena of inspectable heap objects with native classes, prototypes,
//!   parents, ordered property slots and internal references
//! - Interned target strings and a named GC root set
//! - [`core_types::TargetRuntime`] over that graph: root and child tracing,
//!   detecting property lookup, standard and low-level enumeration
//! - JSON heap snapshots
//!
//! # Example
//!
//! ```
//! use core_types::{GcThing, TargetRuntime};
//! use memory_manager::Heap;
//!
//! let mut heap = Heap::new();
//! let global = heap.allocate_plain();
//! let child = heap.allocate_plain();
//! heap.set_property(global, "child", child.into()).unwrap();
//! heap.add_object_root(global, "global").unwrap();
//!
//! let mut traced = Vec::new();
//! heap.trace_children(global, &mut |thing: GcThing| traced.extend(thing.as_object()));
//! assert_eq!(traced, vec![child]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod heap;
pub mod introspect;
pub mod object;
pub mod snapshot;

pub use error::{HeapError, HeapResult};
pub use heap::Heap;
pub use introspect::property_key;
pub use object::{FunctionData, HeapObject, ObjectClass, Slot};
pub use snapshot::{
    load_snapshot, FunctionRecord, HeapSnapshot, LoadedHeap, ObjectRecord, RootRecord,
    ValueRecord, WrapperRecord,
};
