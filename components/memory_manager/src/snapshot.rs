//! JSON heap snapshots.
//!
//! A snapshot lists objects by index; references between objects, roots and
//! named objects are indices into that list. Values are written untagged:
//!
//! ```json
//! {
//!   "objects": [
//!     { "class": "Object", "properties": { "x": { "ref": 1 }, "label": "a" } },
//!     { "class": "Function", "function": { "name": "foo", "filename": "test.js",
//!                                          "lineStart": 10, "lineEnd": 12 } }
//!   ],
//!   "roots": [ { "ref": 0, "name": "global" } ],
//!   "namedObjects": { "main": 0 }
//! }
//! ```

use std::fs;
use std::path::Path;

use core_types::{HeapRef, PropertyKey, TargetValue, WrapperLinks};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{HeapError, HeapResult};
use crate::heap::Heap;
use crate::introspect::property_key;
use crate::object::{FunctionData, ObjectClass};

/// A property or root value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRecord {
    /// Reference to an object by index
    Ref {
        /// Object index
        #[serde(rename = "ref")]
        target: usize,
    },
    /// A boolean
    Boolean(bool),
    /// A number
    Number(f64),
    /// A string; equal strings share one interned allocation
    String(String),
    /// null
    Null,
}

/// Function metadata of a snapshot object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionRecord {
    /// Declared name
    #[serde(default)]
    pub name: Option<String>,
    /// Source file; absent for native functions
    #[serde(default)]
    pub filename: Option<String>,
    /// First source line
    #[serde(default = "default_line")]
    pub line_start: u32,
    /// Last source line; defaults to `line_start`
    #[serde(default)]
    pub line_end: Option<u32>,
    /// Compiled script size in bytes
    #[serde(default)]
    pub script_size: usize,
}

fn default_line() -> u32 {
    1
}

/// Wrapper links of a snapshot object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperRecord {
    /// Wrapped object index
    #[serde(default)]
    pub wrapped: Option<usize>,
    /// Outer object index
    #[serde(default)]
    pub outer: Option<usize>,
    /// Inner object index
    #[serde(default)]
    pub inner: Option<usize>,
}

/// One object of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    /// Native class name; omitted for classless objects
    #[serde(default)]
    pub class: Option<String>,
    /// Extended (wrapper) class
    #[serde(default)]
    pub extended: bool,
    /// Callable without function metadata
    #[serde(default)]
    pub callable: bool,
    /// Prototype index
    #[serde(default)]
    pub prototype: Option<usize>,
    /// Parent index
    #[serde(default)]
    pub parent: Option<usize>,
    /// Enumerable properties
    #[serde(default)]
    pub properties: IndexMap<String, ValueRecord>,
    /// Non-enumerable properties
    #[serde(default)]
    pub hidden: IndexMap<String, ValueRecord>,
    /// Accessor properties, name to getter index
    #[serde(default)]
    pub getters: IndexMap<String, usize>,
    /// Function metadata
    #[serde(default)]
    pub function: Option<FunctionRecord>,
    /// Wrapper links
    #[serde(default)]
    pub wrapper: Option<WrapperRecord>,
    /// Traced references with no property name
    #[serde(default)]
    pub internal: Vec<usize>,
    /// Out-of-line storage charged to the object
    #[serde(default)]
    pub extra_bytes: usize,
}

/// A GC root: an object reference or a bare value, optionally named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootRecord {
    /// Rooted object index
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
    /// Rooted non-object value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueRecord>,
    /// Root name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A serialized heap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeapSnapshot {
    /// Objects, addressed by index
    pub objects: Vec<ObjectRecord>,
    /// GC roots
    #[serde(default)]
    pub roots: Vec<RootRecord>,
    /// Names for selected objects, exposed through a named-objects holder
    #[serde(default)]
    pub named_objects: IndexMap<String, usize>,
}

/// A heap built from a snapshot.
#[derive(Debug)]
pub struct LoadedHeap {
    /// The heap
    pub heap: Heap,
    /// Holder object whose properties are the snapshot's named objects;
    /// `None` when the snapshot names nothing
    pub named_objects: Option<HeapRef>,
}

impl HeapSnapshot {
    /// Parses snapshot JSON.
    pub fn from_json(json: &str) -> HeapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> HeapResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = json.len(), "read heap snapshot");
        Self::from_json(&json)
    }

    /// Builds the heap this snapshot describes.
    ///
    /// Objects are allocated first so that references may point forward.
    pub fn build(&self) -> HeapResult<LoadedHeap> {
        let mut heap = Heap::new();
        let handles: Vec<HeapRef> = self
            .objects
            .iter()
            .map(|record| match class_for(record) {
                Some(class) => heap.allocate(class),
                None => heap.allocate_classless(),
            })
            .collect();
        let resolve = |index: usize| {
            handles.get(index).copied().ok_or(HeapError::UnknownSnapshotRef {
                index,
                count: handles.len(),
            })
        };
        let resolve_opt = |index: Option<usize>| index.map(resolve).transpose();

        for (index, (record, &handle)) in self.objects.iter().zip(&handles).enumerate() {
            heap.set_prototype(handle, resolve_opt(record.prototype)?)?;
            heap.set_parent(handle, resolve_opt(record.parent)?)?;
            for (enumerable, props) in [(true, &record.properties), (false, &record.hidden)] {
                for (name, value) in props {
                    let value = to_value(&mut heap, value, &resolve)?;
                    heap.define_property(handle, property_key(name), value, enumerable)?;
                }
            }
            for (name, getter) in &record.getters {
                heap.define_getter(handle, name, resolve(*getter)?, true)?;
            }
            if let Some(function) = &record.function {
                let data = function_data(&mut heap, index, function)?;
                heap.set_function(handle, data)?;
            }
            if let Some(wrapper) = &record.wrapper {
                let links = WrapperLinks {
                    wrapped: resolve_opt(wrapper.wrapped)?,
                    outer: resolve_opt(wrapper.outer)?,
                    inner: resolve_opt(wrapper.inner)?,
                };
                heap.set_wrapper_links(handle, links)?;
            }
            for internal in &record.internal {
                heap.add_internal_ref(handle, resolve(*internal)?)?;
            }
            heap.set_extra_bytes(handle, record.extra_bytes)?;
        }

        for root in &self.roots {
            let value = match (root.target, &root.value) {
                (Some(index), _) => TargetValue::Object(resolve(index)?),
                (None, Some(value)) => to_value(&mut heap, value, &resolve)?,
                (None, None) => continue,
            };
            heap.add_root(value, root.name.as_deref())?;
        }

        let named_objects = if self.named_objects.is_empty() {
            None
        } else {
            let holder = heap.allocate(ObjectClass::new("NamedObjects"));
            for (name, index) in &self.named_objects {
                heap.define_property(holder, PropertyKey::from(name.as_str()), resolve(*index)?.into(), true)?;
            }
            Some(holder)
        };

        info!(
            objects = heap.len(),
            roots = heap.root_count(),
            named = self.named_objects.len(),
            "built heap from snapshot"
        );
        Ok(LoadedHeap { heap, named_objects })
    }
}

/// Reads a snapshot file and builds its heap.
pub fn load_snapshot(path: impl AsRef<Path>) -> HeapResult<LoadedHeap> {
    HeapSnapshot::load(path)?.build()
}

fn class_for(record: &ObjectRecord) -> Option<ObjectClass> {
    match (&record.class, &record.function) {
        (Some(name), _) => Some(
            ObjectClass::new(name)
                .with_extended(record.extended)
                .with_callable(record.callable),
        ),
        (None, Some(_)) => Some(ObjectClass::function()),
        (None, None) => None,
    }
}

fn function_data(heap: &mut Heap, index: usize, record: &FunctionRecord) -> HeapResult<FunctionData> {
    let name = record.name.as_deref().map(|n| heap.intern(n));
    let Some(filename) = &record.filename else {
        return Ok(FunctionData::native(name));
    };
    let line_end = record.line_end.unwrap_or(record.line_start);
    let extent = line_end
        .checked_sub(record.line_start)
        .and_then(|span| span.checked_add(1))
        .ok_or(HeapError::InvalidLineRange {
            index,
            line_start: record.line_start,
            line_end,
        })?;
    Ok(FunctionData::scripted(name, filename, record.line_start, extent, record.script_size))
}

fn to_value(
    heap: &mut Heap,
    value: &ValueRecord,
    resolve: &dyn Fn(usize) -> HeapResult<HeapRef>,
) -> HeapResult<TargetValue> {
    Ok(match value {
        ValueRecord::Ref { target } => TargetValue::Object(resolve(*target)?),
        ValueRecord::Boolean(b) => TargetValue::Boolean(*b),
        ValueRecord::Number(n) => TargetValue::Number(*n),
        ValueRecord::String(s) => heap.string(s),
        ValueRecord::Null => TargetValue::Null,
    })
}
