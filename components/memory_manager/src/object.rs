//! Heap object representation.
//!
//! A [`HeapObject`] is a native class, a prototype/parent pair, an ordered
//! slot table and whatever extra edges its class carries (function metadata,
//! wrapper links, internal references).

use std::sync::Arc;

use core_types::{HeapRef, PropertyKey, ScriptInfo, TargetString, TargetValue, WrapperLinks};
use indexmap::IndexMap;

/// Fixed per-object header size in bytes.
pub const OBJECT_HEADER_SIZE: usize = 32;
/// Bytes charged per property slot.
pub const SLOT_SIZE: usize = 16;
/// Bytes charged per internal reference.
pub const INTERNAL_REF_SIZE: usize = 8;
/// Extra bytes charged to callable objects.
pub const FUNCTION_SIZE: usize = 64;

/// The native class of an object.
///
/// # Example
///
/// ```
/// use memory_manager::ObjectClass;
///
/// let wrapper = ObjectClass::extended("XPCWrappedNative");
/// assert!(wrapper.is_extended());
/// assert!(!wrapper.is_callable());
/// assert!(ObjectClass::function().is_callable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectClass {
    name: Arc<str>,
    extended: bool,
    callable: bool,
}

impl ObjectClass {
    /// A plain class.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            extended: false,
            callable: false,
        }
    }

    /// An extended class, whose instances may carry wrapper links.
    pub fn extended(name: &str) -> Self {
        Self {
            extended: true,
            ..Self::new(name)
        }
    }

    /// The `Function` class.
    pub fn function() -> Self {
        Self::new("Function").with_callable(true)
    }

    /// Sets whether instances are callable.
    pub fn with_callable(mut self, callable: bool) -> Self {
        self.callable = callable;
        self
    }

    /// Sets whether the class is extended.
    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true for extended classes.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Returns true if instances can be called.
    pub fn is_callable(&self) -> bool {
        self.callable
    }
}

/// One property slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A stored value
    Data {
        /// The value
        value: TargetValue,
        /// Visible to standard enumeration
        enumerable: bool,
    },
    /// An accessor; the getter is an object edge but is never invoked
    Getter {
        /// Getter function object
        getter: HeapRef,
        /// Visible to standard enumeration
        enumerable: bool,
    },
}

impl Slot {
    /// Returns true if standard enumeration reports this slot.
    pub fn is_enumerable(&self) -> bool {
        match self {
            Slot::Data { enumerable, .. } | Slot::Getter { enumerable, .. } => *enumerable,
        }
    }

    /// The value a detecting lookup sees: accessors read as `undefined`.
    pub fn detected_value(&self) -> TargetValue {
        match self {
            Slot::Data { value, .. } => value.clone(),
            Slot::Getter { .. } => TargetValue::Undefined,
        }
    }
}

/// Metadata carried by function objects.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    /// Declared name
    pub name: Option<TargetString>,
    /// Compiled script; `None` for native functions
    pub script: Option<ScriptInfo>,
}

impl FunctionData {
    /// A natively implemented function.
    pub fn native(name: Option<TargetString>) -> Self {
        Self { name, script: None }
    }

    /// A function compiled from `filename`, spanning `line_extent` lines
    /// from `base_line`.
    pub fn scripted(
        name: Option<TargetString>,
        filename: &str,
        base_line: u32,
        line_extent: u32,
        script_size: usize,
    ) -> Self {
        Self {
            name,
            script: Some(ScriptInfo {
                filename: Arc::from(filename),
                base_line,
                line_extent,
                size: script_size,
            }),
        }
    }
}

/// An object in the reference heap.
#[derive(Debug, Clone, Default)]
pub struct HeapObject {
    pub(crate) class: Option<ObjectClass>,
    pub(crate) prototype: Option<HeapRef>,
    pub(crate) parent: Option<HeapRef>,
    pub(crate) slots: IndexMap<PropertyKey, Slot>,
    pub(crate) function: Option<FunctionData>,
    pub(crate) wrapper: WrapperLinks,
    pub(crate) internal: Vec<HeapRef>,
    pub(crate) extra_bytes: usize,
}

impl HeapObject {
    /// Creates an object with no slots.
    pub fn new(class: Option<ObjectClass>) -> Self {
        Self {
            class,
            ..Self::default()
        }
    }

    /// Native class, if any.
    pub fn class(&self) -> Option<&ObjectClass> {
        self.class.as_ref()
    }

    /// Prototype object.
    pub fn prototype(&self) -> Option<HeapRef> {
        self.prototype
    }

    /// Parent (scope) object.
    pub fn parent(&self) -> Option<HeapRef> {
        self.parent
    }

    /// Looks up an own slot.
    pub fn slot(&self, key: &PropertyKey) -> Option<&Slot> {
        self.slots.get(key)
    }

    /// Own slots in definition order.
    pub fn slots(&self) -> impl Iterator<Item = (&PropertyKey, &Slot)> {
        self.slots.iter()
    }

    /// Function metadata, if this is a function object.
    pub fn function(&self) -> Option<&FunctionData> {
        self.function.as_ref()
    }

    /// Returns true if the object can be called.
    pub fn is_callable(&self) -> bool {
        self.function.is_some() || self.class.as_ref().is_some_and(ObjectClass::is_callable)
    }

    /// Size in bytes: header, slots, internal references, function
    /// storage and any extra bytes the object was charged.
    pub fn size(&self) -> usize {
        let function = if self.is_callable() { FUNCTION_SIZE } else { 0 };
        OBJECT_HEADER_SIZE
            + self.slots.len() * SLOT_SIZE
            + self.internal.len() * INTERNAL_REF_SIZE
            + function
            + self.extra_bytes
    }
}
