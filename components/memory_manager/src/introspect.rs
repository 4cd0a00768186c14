//! [`TargetRuntime`] for the reference heap.
//!
//! Child tracing reports edges in a fixed order: prototype, parent, slot
//! values (getters included), function name, wrapper links, internal
//! references. Strings are reported as string things and numbers as
//! doubles, so a tracer sees every GC thing an object holds.

use std::collections::HashSet;

use core_types::{
    ClassInfo, FunctionInfo, GcRoot, GcThing, HeapRef, ProfilerResult, PropertyKey, RootMapControl,
    TargetRuntime, TargetValue, Tracer, WrapperLinks,
};

use crate::error::HeapError;
use crate::heap::Heap;
use crate::object::{HeapObject, Slot};

/// Maps a property name to the key it is stored under. Canonical array
/// indices (`"0"`, `"17"`, not `"007"`) are element keys.
pub fn property_key(name: &str) -> PropertyKey {
    match name.parse::<u32>() {
        Ok(index) if index.to_string() == name => PropertyKey::Index(index),
        _ => PropertyKey::from(name),
    }
}

fn trace_value(value: &TargetValue, tracer: &mut dyn Tracer) {
    match value {
        TargetValue::Object(r) => tracer.trace(GcThing::Object(*r)),
        TargetValue::String(s) => tracer.trace(GcThing::String(s.clone())),
        TargetValue::Number(n) => tracer.trace(GcThing::Double(*n)),
        TargetValue::Undefined | TargetValue::Null | TargetValue::Boolean(_) => {}
    }
}

impl Heap {
    fn require(&self, object: HeapRef) -> Result<&HeapObject, HeapError> {
        self.get(object).ok_or(HeapError::UnknownObject(object))
    }

    /// Prototype chain starting at `object` itself, stopping at a cycle.
    fn chain(&self, object: HeapRef) -> Result<Vec<&HeapObject>, HeapError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(object);
        while let Some(current) = next {
            if !visited.insert(current) {
                break;
            }
            let obj = self.require(current)?;
            chain.push(obj);
            next = obj.prototype;
        }
        Ok(chain)
    }
}

impl TargetRuntime for Heap {
    fn trace_roots(&self, tracer: &mut dyn Tracer) {
        for root in &self.roots {
            tracer.trace(root.thing.clone());
        }
    }

    fn trace_children(&self, object: HeapRef, tracer: &mut dyn Tracer) {
        let Some(obj) = self.get(object) else {
            return;
        };
        for edge in [obj.prototype, obj.parent].into_iter().flatten() {
            tracer.trace(GcThing::Object(edge));
        }
        for slot in obj.slots.values() {
            match slot {
                Slot::Data { value, .. } => trace_value(value, tracer),
                Slot::Getter { getter, .. } => tracer.trace(GcThing::Object(*getter)),
            }
        }
        if let Some(name) = obj.function.as_ref().and_then(|f| f.name.clone()) {
            tracer.trace(GcThing::String(name));
        }
        let links = obj.wrapper;
        for edge in [links.wrapped, links.outer, links.inner].into_iter().flatten() {
            tracer.trace(GcThing::Object(edge));
        }
        for edge in &obj.internal {
            tracer.trace(GcThing::Object(*edge));
        }
    }

    fn map_gc_roots(&self, visit: &mut dyn FnMut(GcRoot<'_>) -> RootMapControl) {
        for root in &self.roots {
            let control = visit(GcRoot {
                thing: root.thing.clone(),
                name: root.name.as_deref(),
            });
            if control == RootMapControl::Stop {
                break;
            }
        }
    }

    fn class_of(&self, object: HeapRef) -> Option<ClassInfo<'_>> {
        self.get(object)?.class().map(|class| ClassInfo {
            name: class.name(),
            extended: class.is_extended(),
        })
    }

    fn object_size(&self, object: HeapRef) -> usize {
        self.get(object).map_or(0, HeapObject::size)
    }

    fn parent_of(&self, object: HeapRef) -> Option<HeapRef> {
        self.get(object)?.parent
    }

    fn prototype_of(&self, object: HeapRef) -> Option<HeapRef> {
        self.get(object)?.prototype
    }

    fn is_callable(&self, object: HeapRef) -> bool {
        self.get(object).is_some_and(HeapObject::is_callable)
    }

    fn function_info(&self, object: HeapRef) -> Option<FunctionInfo> {
        let obj = self.get(object).filter(|o| o.is_callable())?;
        let function = obj.function.as_ref();
        Some(FunctionInfo {
            name: function.and_then(|f| f.name.clone()),
            size: obj.size(),
            script: function.and_then(|f| f.script.clone()),
        })
    }

    fn wrapper_links(&self, object: HeapRef) -> WrapperLinks {
        self.get(object).map(|o| o.wrapper).unwrap_or_default()
    }

    fn lookup_property(&self, object: HeapRef, name: &str) -> ProfilerResult<Option<TargetValue>> {
        let key = property_key(name);
        let found = self
            .chain(object)?
            .into_iter()
            .find_map(|obj| obj.slot(&key))
            .map(Slot::detected_value);
        Ok(found)
    }

    fn enumerate_keys(&self, object: HeapRef) -> ProfilerResult<Vec<PropertyKey>> {
        let mut shadowed = HashSet::new();
        let mut keys = Vec::new();
        for obj in self.chain(object)? {
            for (key, slot) in obj.slots() {
                // A non-enumerable own key still hides an inherited one.
                if shadowed.insert(key.clone()) && slot.is_enumerable() {
                    keys.push(key.clone());
                }
            }
        }
        Ok(keys)
    }

    fn property_entries(&self, object: HeapRef) -> ProfilerResult<Vec<(PropertyKey, TargetValue)>> {
        let obj = self.require(object)?;
        Ok(obj
            .slots()
            .map(|(key, slot)| (key.clone(), slot.detected_value()))
            .collect())
    }
}
