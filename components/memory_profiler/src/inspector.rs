//! Read-only queries over the target heap, keyed by object id.
//!
//! Every query takes the session's completed [`IdentifierTable`]. Unknown
//! ids are not errors: they yield `None`, which script sees as `null`.

use std::collections::{BTreeMap, HashSet};

use core_types::{
    GcThing, HeapRef, ObjectId, ProfilerResult, PropertyKey, RootMapControl, TargetRuntime,
    TargetString, TargetValue,
};
use indexmap::IndexMap;

use crate::descriptor::{ClassTally, FunctionMetadata, ObjectDescriptor, PropertyValue, WrapperDescriptor};
use crate::id_table::IdentifierTable;
use crate::walker::HeapWalker;

/// Tally bucket for objects without a native class.
pub const CLASSLESS: &str = "(none)";

/// Object inspector for one session.
#[derive(Debug)]
pub struct Inspector<'a, T: ?Sized> {
    target: &'a T,
    table: &'a IdentifierTable,
}

impl<'a, T: TargetRuntime + ?Sized> Inspector<'a, T> {
    /// Create an inspector over a fully built table.
    pub fn new(target: &'a T, table: &'a IdentifierTable) -> Self {
        Self { target, table }
    }

    fn id_of(&self, object: Option<HeapRef>) -> Option<ObjectId> {
        object.map(|o| self.table.lookup_id(o))
    }

    fn property_value(&self, value: TargetValue) -> PropertyValue {
        match value {
            TargetValue::Object(object) => PropertyValue::Object(self.table.lookup_id(object)),
            TargetValue::String(s) => PropertyValue::String(s),
            _ => PropertyValue::Null,
        }
    }

    /// Full descriptor of `id`.
    pub fn describe(&self, id: ObjectId) -> ProfilerResult<Option<ObjectDescriptor>> {
        let Some(object) = self.table.lookup_ref(id) else {
            return Ok(None);
        };
        let class = self.target.class_of(object);
        let wrapper = class.filter(|c| c.extended).map(|_| {
            let links = self.target.wrapper_links(object);
            WrapperDescriptor {
                wrapped_object: self.id_of(links.wrapped),
                outer_object: self.id_of(links.outer),
                inner_object: self.id_of(links.inner),
            }
        });
        let children = HeapWalker::new(self.target, self.table).children_of(object, id)?;
        Ok(Some(ObjectDescriptor {
            id,
            native_class: class.map(|c| c.name.to_string()),
            size: self.target.object_size(object),
            parent: self.id_of(self.target.parent_of(object)),
            prototype: self.id_of(self.target.prototype_of(object)),
            wrapper,
            function: self.function_metadata(object),
            children,
        }))
    }

    fn function_metadata(&self, object: HeapRef) -> Option<FunctionMetadata> {
        if !self.target.is_callable(object) {
            return None;
        }
        let info = self.target.function_info(object)?;
        let script = info.script.as_ref();
        Some(FunctionMetadata {
            name: info.name,
            filename: script.map(|s| TargetString::new(s.filename.clone())),
            line_start: script.map(|s| s.base_line),
            line_end: script.map(|s| s.line_end()),
            function_size: info.size,
            script_size: script.map(|s| s.size),
        })
    }

    /// Function metadata of `id`; `None` for unknown ids and non-callables.
    pub fn function_info(&self, id: ObjectId) -> Option<FunctionMetadata> {
        self.table.lookup_ref(id).and_then(|o| self.function_metadata(o))
    }

    /// Parent of `id`.
    ///
    /// The outer `None` means the id is unknown, the inner one that the
    /// object has no parent.
    pub fn parent(&self, id: ObjectId) -> Option<Option<ObjectId>> {
        let object = self.table.lookup_ref(id)?;
        Some(self.id_of(self.target.parent_of(object)))
    }

    /// Value of `name` on `id`, looked up without running getters.
    pub fn property(&self, id: ObjectId, name: &str) -> ProfilerResult<Option<PropertyValue>> {
        let Some(object) = self.table.lookup_ref(id) else {
            return Ok(None);
        };
        let value = self.target.lookup_property(object, name)?;
        Ok(value.map(|v| self.property_value(v)))
    }

    /// Every property of `id`.
    ///
    /// Standard enumeration lists own and inherited enumerable keys and
    /// reads each through detecting lookup. `use_alternate` switches to the
    /// low-level iterator, which lists every own key.
    pub fn properties(
        &self,
        id: ObjectId,
        use_alternate: bool,
    ) -> ProfilerResult<Option<IndexMap<String, PropertyValue>>> {
        let Some(object) = self.table.lookup_ref(id) else {
            return Ok(None);
        };
        let mut properties = IndexMap::new();
        if use_alternate {
            for (key, value) in self.target.property_entries(object)? {
                properties.insert(key.to_string(), self.property_value(value));
            }
        } else {
            for key in self.target.enumerate_keys(object)? {
                let name = key.to_string();
                let value = self
                    .target
                    .lookup_property(object, &name)?
                    .map_or(PropertyValue::Null, |v| self.property_value(v));
                properties.insert(name, value);
            }
        }
        Ok(Some(properties))
    }

    /// Standard-enumeration keys of `id`.
    pub fn enumerate(&self, id: ObjectId) -> ProfilerResult<Option<Vec<PropertyKey>>> {
        match self.table.lookup_ref(id) {
            Some(object) => self.target.enumerate_keys(object).map(Some),
            None => Ok(None),
        }
    }

    /// Ids of the registered GC roots, in root order.
    ///
    /// Roots that are not objects, or that the walk did not reach, are
    /// skipped.
    pub fn root_ids(&self) -> Vec<ObjectId> {
        let mut ids = Vec::new();
        self.target.map_gc_roots(&mut |root| {
            if let GcThing::Object(object) = root.thing {
                let id = self.table.lookup_id(object);
                if !id.is_none() {
                    ids.push(id);
                }
            }
            RootMapControl::Next
        });
        ids
    }

    /// Every tracked id with its native class name.
    pub fn object_table(&self) -> Vec<(ObjectId, Option<&'a str>)> {
        let target = self.target;
        self.table
            .ids()
            .map(|id| {
                let class = self.table.lookup_ref(id).and_then(|o| target.class_of(o)).map(|c| c.name);
                (id, class)
            })
            .collect()
    }

    /// Object count and total size per native class, sorted by class name.
    pub fn class_tallies(&self) -> Vec<ClassTally> {
        let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for id in self.table.ids() {
            let Some(object) = self.table.lookup_ref(id) else {
                continue;
            };
            let class = self.target.class_of(object).map_or(CLASSLESS, |c| c.name);
            let entry = tallies.entry(class).or_default();
            entry.0 += 1;
            entry.1 += self.target.object_size(object);
        }
        tallies
            .into_iter()
            .map(|(class, (count, size))| ClassTally {
                class: class.to_string(),
                count,
                size,
            })
            .collect()
    }

    /// Descriptors of everything reachable from `id`, itself included.
    ///
    /// Stops after `limit` descriptors; the flag reports whether it did.
    pub fn dump_from(
        &self,
        id: ObjectId,
        limit: usize,
    ) -> ProfilerResult<Option<(IndexMap<ObjectId, ObjectDescriptor>, bool)>> {
        if self.table.lookup_ref(id).is_none() {
            return Ok(None);
        }
        let mut dumped = IndexMap::new();
        let mut seen = HashSet::from([id]);
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if dumped.len() >= limit {
                return Ok(Some((dumped, true)));
            }
            let Some(descriptor) = self.describe(next)? else {
                continue;
            };
            // Reverse so children are dumped in trace order.
            for &child in descriptor.children.iter().rev() {
                if seen.insert(child) {
                    pending.push(child);
                }
            }
            dumped.insert(next, descriptor);
        }
        Ok(Some((dumped, false)))
    }

    /// Objects published through the named-objects root.
    ///
    /// Each enumerable object-valued property of `root` becomes a name to id
    /// entry. Other values, and objects the walk never reached, are skipped,
    /// so every listed name also resolves through [`Inspector::resolve_name`].
    pub fn named_objects(&self, root: HeapRef) -> ProfilerResult<IndexMap<String, ObjectId>> {
        let mut named = IndexMap::new();
        for key in self.target.enumerate_keys(root)? {
            let name = key.to_string();
            if let Some(TargetValue::Object(object)) = self.target.lookup_property(root, &name)? {
                let id = self.table.lookup_id(object);
                if !id.is_none() {
                    named.insert(name, id);
                }
            }
        }
        Ok(named)
    }

    /// Resolve a name through the named-objects root.
    ///
    /// `None` when there is no root, no such object-valued property, or the
    /// object was never reached.
    pub fn resolve_name(&self, root: Option<HeapRef>, name: &str) -> ProfilerResult<Option<ObjectId>> {
        let Some(root) = root else {
            return Ok(None);
        };
        match self.target.lookup_property(root, name)? {
            Some(TargetValue::Object(object)) => {
                let id = self.table.lookup_id(object);
                Ok((!id.is_none()).then_some(id))
            }
            _ => Ok(None),
        }
    }
}
