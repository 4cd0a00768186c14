//! The reference heap: an arena of [`HeapObject`]s plus interned strings
//! and a named root set.
//!
//! Handles are arena indices offset by one, so the null handle is never
//! produced. Nothing is ever freed; a heap lives as long as the snapshot it
//! models.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use core_types::{GcThing, HeapRef, PropertyKey, TargetString, TargetValue, WrapperLinks};
use tracing::trace;

use crate::error::{HeapError, HeapResult};
use crate::object::{FunctionData, HeapObject, ObjectClass, Slot};

/// A registered GC root.
#[derive(Debug, Clone)]
pub(crate) struct RootEntry {
    pub(crate) thing: GcThing,
    pub(crate) name: Option<String>,
}

/// An in-memory object graph.
///
/// # Example
///
/// ```
/// use memory_manager::{Heap, ObjectClass};
///
/// let mut heap = Heap::new();
/// let a = heap.allocate_plain();
/// let b = heap.allocate(ObjectClass::new("Array"));
/// heap.set_property(a, "x", b.into()).unwrap();
/// heap.add_object_root(a, "global").unwrap();
///
/// assert_eq!(heap.len(), 2);
/// assert_eq!(heap.root_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
    strings: HashMap<Arc<str>, TargetString>,
    pub(crate) roots: Vec<RootEntry>,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an object of `class`.
    pub fn allocate(&mut self, class: ObjectClass) -> HeapRef {
        self.push(HeapObject::new(Some(class)))
    }

    /// Allocates an `Object`-class object.
    pub fn allocate_plain(&mut self) -> HeapRef {
        self.allocate(ObjectClass::new("Object"))
    }

    /// Allocates an object without a native class.
    pub fn allocate_classless(&mut self) -> HeapRef {
        self.push(HeapObject::new(None))
    }

    /// Allocates a `Function`-class object carrying `function`.
    pub fn allocate_function(&mut self, function: FunctionData) -> HeapRef {
        let mut object = HeapObject::new(Some(ObjectClass::function()));
        object.function = Some(function);
        self.push(object)
    }

    fn push(&mut self, object: HeapObject) -> HeapRef {
        let index = self.objects.len();
        self.objects.push(object);
        let handle = HeapRef::new(NonZeroU64::MIN.saturating_add(index as u64));
        trace!(handle = %handle, "allocated object");
        handle
    }

    /// Returns the interned string for `chars`, creating it on first use.
    ///
    /// Interned strings share one allocation, so they also share one
    /// identity.
    pub fn intern(&mut self, chars: &str) -> TargetString {
        if let Some(existing) = self.strings.get(chars) {
            return existing.clone();
        }
        let string = TargetString::new(chars);
        self.strings.insert(string.chars().clone(), string.clone());
        string
    }

    /// Interns `chars` and wraps it as a value.
    pub fn string(&mut self, chars: &str) -> TargetValue {
        TargetValue::String(self.intern(chars))
    }

    /// Looks up an object.
    pub fn get(&self, object: HeapRef) -> Option<&HeapObject> {
        let index = usize::try_from(object.raw() - 1).ok()?;
        self.objects.get(index)
    }

    fn get_mut(&mut self, object: HeapRef) -> HeapResult<&mut HeapObject> {
        let index = usize::try_from(object.raw() - 1).map_err(|_| HeapError::UnknownObject(object))?;
        self.objects
            .get_mut(index)
            .ok_or(HeapError::UnknownObject(object))
    }

    fn check(&self, object: HeapRef) -> HeapResult<()> {
        self.get(object)
            .map(|_| ())
            .ok_or(HeapError::UnknownObject(object))
    }

    fn check_value(&self, value: &TargetValue) -> HeapResult<()> {
        match value.as_object() {
            Some(object) => self.check(object),
            None => Ok(()),
        }
    }

    /// Sets an enumerable named property.
    pub fn set_property(&mut self, object: HeapRef, name: &str, value: TargetValue) -> HeapResult<()> {
        self.define_property(object, PropertyKey::from(name), value, true)
    }

    /// Sets an enumerable indexed element.
    pub fn set_element(&mut self, object: HeapRef, index: u32, value: TargetValue) -> HeapResult<()> {
        self.define_property(object, PropertyKey::Index(index), value, true)
    }

    /// Defines a data property with explicit enumerability.
    ///
    /// Redefining an existing key keeps its original position.
    pub fn define_property(
        &mut self,
        object: HeapRef,
        key: PropertyKey,
        value: TargetValue,
        enumerable: bool,
    ) -> HeapResult<()> {
        self.check_value(&value)?;
        self.get_mut(object)?
            .slots
            .insert(key, Slot::Data { value, enumerable });
        Ok(())
    }

    /// Defines an accessor property backed by `getter`.
    pub fn define_getter(
        &mut self,
        object: HeapRef,
        name: &str,
        getter: HeapRef,
        enumerable: bool,
    ) -> HeapResult<()> {
        self.check(getter)?;
        self.get_mut(object)?
            .slots
            .insert(PropertyKey::from(name), Slot::Getter { getter, enumerable });
        Ok(())
    }

    /// Sets the prototype.
    pub fn set_prototype(&mut self, object: HeapRef, prototype: Option<HeapRef>) -> HeapResult<()> {
        if let Some(proto) = prototype {
            self.check(proto)?;
        }
        self.get_mut(object)?.prototype = prototype;
        Ok(())
    }

    /// Sets the parent (scope) object.
    pub fn set_parent(&mut self, object: HeapRef, parent: Option<HeapRef>) -> HeapResult<()> {
        if let Some(parent) = parent {
            self.check(parent)?;
        }
        self.get_mut(object)?.parent = parent;
        Ok(())
    }

    /// Attaches function metadata, making the object callable.
    pub fn set_function(&mut self, object: HeapRef, function: FunctionData) -> HeapResult<()> {
        self.get_mut(object)?.function = Some(function);
        Ok(())
    }

    /// Sets wrapper links. They are traced for every object but only
    /// reported by introspection for extended classes.
    pub fn set_wrapper_links(&mut self, object: HeapRef, links: WrapperLinks) -> HeapResult<()> {
        for linked in [links.wrapped, links.outer, links.inner].into_iter().flatten() {
            self.check(linked)?;
        }
        self.get_mut(object)?.wrapper = links;
        Ok(())
    }

    /// Adds an edge that is traced but not visible as a property.
    pub fn add_internal_ref(&mut self, object: HeapRef, target: HeapRef) -> HeapResult<()> {
        self.check(target)?;
        self.get_mut(object)?.internal.push(target);
        Ok(())
    }

    /// Charges `bytes` of out-of-line storage to `object`.
    pub fn set_extra_bytes(&mut self, object: HeapRef, bytes: usize) -> HeapResult<()> {
        self.get_mut(object)?.extra_bytes = bytes;
        Ok(())
    }

    /// Registers a GC root. Values that are not GC things are ignored.
    pub fn add_root(&mut self, value: TargetValue, name: Option<&str>) -> HeapResult<()> {
        let thing = match value {
            TargetValue::Object(object) => {
                self.check(object)?;
                GcThing::Object(object)
            }
            TargetValue::String(s) => GcThing::String(s),
            TargetValue::Number(n) => GcThing::Double(n),
            TargetValue::Undefined | TargetValue::Null | TargetValue::Boolean(_) => return Ok(()),
        };
        self.roots.push(RootEntry {
            thing,
            name: name.map(str::to_owned),
        });
        Ok(())
    }

    /// Registers `object` as a named GC root.
    pub fn add_object_root(&mut self, object: HeapRef, name: &str) -> HeapResult<()> {
        self.add_root(TargetValue::Object(object), Some(name))
    }

    /// Number of allocated objects, reachable or not.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Number of registered roots.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }
}
