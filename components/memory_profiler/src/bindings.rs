//! Host operations exposed to profiling script.
//!
//! [`SessionBindings`] is the only place target data turns into script
//! values. Object identity crosses as ids from the identifier table and
//! target strings cross through the string mirror; everything else is
//! built fresh in the calling context.

use std::collections::HashMap;

use core_types::{
    HeapRef, HostFunctions, ObjectId, ProfilerError, ProfilerResult, ScriptArray, ScriptObject,
    ScriptString, ScriptValue, StringFactory, TargetRuntime, TargetString,
};

use crate::config::ProfilerConfig;
use crate::descriptor::{FunctionMetadata, ObjectDescriptor, PropertyValue};
use crate::id_table::IdentifierTable;
use crate::inspector::Inspector;
use crate::string_mirror::StringMirror;

/// Operations every session registers.
pub const CORE_OPERATIONS: &[&str] = &[
    "getGCRoots",
    "getObjectInfo",
    "getObjectParent",
    "getObjectProperties",
    "getObjectProperty",
    "getNamedObjects",
    "getObjectTable",
];

/// Operations registered when [`ProfilerConfig::register_helpers`] is set.
pub const HELPER_OPERATIONS: &[&str] = &["enumerate", "functionInfo", "getClassTallies", "dumpHeap"];

/// Dispatches host calls for one running session.
pub struct SessionBindings<'s, T: ?Sized> {
    target: &'s T,
    table: &'s IdentifierTable,
    mirror: &'s mut StringMirror,
    config: &'s ProfilerConfig,
    named_objects: Option<HeapRef>,
    calls: usize,
}

impl<'s, T: TargetRuntime + ?Sized> SessionBindings<'s, T> {
    /// Bind the session's state for one evaluation.
    pub fn new(
        target: &'s T,
        table: &'s IdentifierTable,
        mirror: &'s mut StringMirror,
        config: &'s ProfilerConfig,
        named_objects: Option<HeapRef>,
    ) -> Self {
        Self {
            target,
            table,
            mirror,
            config,
            named_objects,
            calls: 0,
        }
    }

    /// Number of host calls dispatched so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn inspector(&self) -> Inspector<'s, T> {
        Inspector::new(self.target, self.table)
    }

    /// Resolve an `idOrName` argument.
    ///
    /// Unknown ids and names resolve to `None`; arguments that are neither a
    /// non-negative integer nor a string are usage errors.
    fn target_id(&self, op: &str, arg: Option<&ScriptValue>) -> ProfilerResult<Option<ObjectId>> {
        match arg {
            Some(ScriptValue::Number(n)) => {
                let id = ObjectId::from_number(*n).ok_or_else(|| {
                    ProfilerError::usage(format!("{op}: {n} is not a valid object id"))
                })?;
                Ok(self.table.lookup_ref(id).map(|_| id))
            }
            Some(ScriptValue::String(name)) => {
                self.inspector().resolve_name(self.named_objects, name.as_str())
            }
            Some(other) => Err(ProfilerError::usage(format!(
                "{op}: expected an object id or name, got {}",
                other.type_of()
            ))),
            None => Err(ProfilerError::usage(format!("{op}: missing object id or name"))),
        }
    }

    fn mirror(&mut self, strings: &mut dyn StringFactory, s: &TargetString) -> ProfilerResult<ScriptValue> {
        self.mirror.mirror(strings, s).map(ScriptValue::String)
    }

    fn property_value(
        &mut self,
        strings: &mut dyn StringFactory,
        value: &PropertyValue,
    ) -> ProfilerResult<ScriptValue> {
        match value {
            PropertyValue::Object(id) => Ok((*id).into()),
            PropertyValue::String(s) => self.mirror(strings, s),
            PropertyValue::Null => Ok(ScriptValue::Null),
        }
    }

    fn function_object(
        &mut self,
        strings: &mut dyn StringFactory,
        into: &ScriptObject,
        meta: &FunctionMetadata,
    ) -> ProfilerResult<()> {
        if let Some(name) = &meta.name {
            into.set("name", self.mirror(strings, name)?);
        }
        if let Some(filename) = &meta.filename {
            into.set("filename", self.mirror(strings, filename)?);
        }
        if let Some(line) = meta.line_start {
            into.set("lineStart", f64::from(line).into());
        }
        if let Some(line) = meta.line_end {
            into.set("lineEnd", f64::from(line).into());
        }
        into.set("functionSize", (meta.function_size as f64).into());
        if let Some(size) = meta.script_size {
            into.set("scriptSize", (size as f64).into());
        }
        Ok(())
    }

    fn descriptor_object(
        &mut self,
        strings: &mut dyn StringFactory,
        descriptor: &ObjectDescriptor,
    ) -> ProfilerResult<ScriptValue> {
        let info = ScriptObject::new();
        info.set("id", descriptor.id.into());
        if let Some(class) = &descriptor.native_class {
            info.set("nativeClass", strings.new_string(class)?.into());
        }
        info.set("size", (descriptor.size as f64).into());
        if let Some(parent) = descriptor.parent {
            info.set("parent", parent.into());
        }
        if let Some(prototype) = descriptor.prototype {
            info.set("prototype", prototype.into());
        }
        if let Some(wrapper) = &descriptor.wrapper {
            let links = [
                ("wrappedObject", wrapper.wrapped_object),
                ("outerObject", wrapper.outer_object),
                ("innerObject", wrapper.inner_object),
            ];
            for (field, link) in links {
                if let Some(id) = link {
                    info.set(field, id.into());
                }
            }
        }
        if let Some(meta) = &descriptor.function {
            self.function_object(strings, &info, meta)?;
        }
        let children = descriptor.children.iter().map(|&id| id.into()).collect();
        info.set("children", ScriptValue::Array(ScriptArray::from_vec(children)));
        Ok(ScriptValue::Object(info))
    }

    fn get_object_info(&mut self, strings: &mut dyn StringFactory, args: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        let Some(id) = self.target_id("getObjectInfo", args.first())? else {
            return Ok(ScriptValue::Null);
        };
        match self.inspector().describe(id)? {
            Some(descriptor) => self.descriptor_object(strings, &descriptor),
            None => Ok(ScriptValue::Null),
        }
    }

    fn get_object_parent(&self, args: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        let parent = self
            .target_id("getObjectParent", args.first())?
            .and_then(|id| self.inspector().parent(id))
            .flatten();
        Ok(parent.map_or(ScriptValue::Null, ScriptValue::from))
    }

    fn get_object_properties(
        &mut self,
        strings: &mut dyn StringFactory,
        args: &[ScriptValue],
    ) -> ProfilerResult<ScriptValue> {
        let Some(id) = self.target_id("getObjectProperties", args.first())? else {
            return Ok(ScriptValue::Null);
        };
        let use_alternate = args.get(1).is_some_and(ScriptValue::is_truthy);
        let Some(properties) = self.inspector().properties(id, use_alternate)? else {
            return Ok(ScriptValue::Null);
        };
        let result = ScriptObject::new();
        for (name, value) in &properties {
            result.set(name.as_str(), self.property_value(strings, value)?);
        }
        Ok(ScriptValue::Object(result))
    }

    fn get_object_property(
        &mut self,
        strings: &mut dyn StringFactory,
        args: &[ScriptValue],
    ) -> ProfilerResult<ScriptValue> {
        let id = self.target_id("getObjectProperty", args.first())?;
        let name = match args.get(1) {
            Some(ScriptValue::String(name)) => name.clone(),
            Some(other) => {
                return Err(ProfilerError::usage(format!(
                    "getObjectProperty: property name must be a string, got {}",
                    other.type_of()
                )))
            }
            None => return Err(ProfilerError::usage("getObjectProperty: missing property name")),
        };
        let Some(id) = id else {
            return Ok(ScriptValue::Null);
        };
        match self.inspector().property(id, name.as_str())? {
            Some(value) => self.property_value(strings, &value),
            None => Ok(ScriptValue::Null),
        }
    }

    fn get_named_objects(&self) -> ProfilerResult<ScriptValue> {
        let result = ScriptObject::new();
        if let Some(root) = self.named_objects {
            for (name, id) in self.inspector().named_objects(root)? {
                result.set(name, id.into());
            }
        }
        Ok(ScriptValue::Object(result))
    }

    fn get_object_table(&self, strings: &mut dyn StringFactory) -> ProfilerResult<ScriptValue> {
        let result = ScriptObject::new();
        // One script string per class name, shared by every entry.
        let mut names: HashMap<&str, ScriptString> = HashMap::new();
        for (id, class) in self.inspector().object_table() {
            let value = match class {
                Some(class) => match names.get(class) {
                    Some(name) => ScriptValue::String(name.clone()),
                    None => {
                        let name = strings.new_string(class)?;
                        names.insert(class, name.clone());
                        ScriptValue::String(name)
                    }
                },
                None => ScriptValue::Null,
            };
            result.set(id.to_string(), value);
        }
        Ok(ScriptValue::Object(result))
    }

    fn enumerate(&self, strings: &mut dyn StringFactory, args: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        let Some(id) = self.target_id("enumerate", args.first())? else {
            return Ok(ScriptValue::Null);
        };
        let Some(keys) = self.inspector().enumerate(id)? else {
            return Ok(ScriptValue::Null);
        };
        let mut names = Vec::with_capacity(keys.len());
        for key in keys {
            names.push(strings.new_string(&key.to_string())?.into());
        }
        Ok(ScriptValue::Array(ScriptArray::from_vec(names)))
    }

    fn function_info(&mut self, strings: &mut dyn StringFactory, args: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        let meta = self
            .target_id("functionInfo", args.first())?
            .and_then(|id| self.inspector().function_info(id));
        let Some(meta) = meta else {
            return Ok(ScriptValue::Null);
        };
        let info = ScriptObject::new();
        self.function_object(strings, &info, &meta)?;
        Ok(ScriptValue::Object(info))
    }

    fn get_class_tallies(&self) -> ScriptValue {
        let result = ScriptObject::new();
        for tally in self.inspector().class_tallies() {
            let entry = ScriptObject::new();
            entry.set("count", (tally.count as f64).into());
            entry.set("size", (tally.size as f64).into());
            result.set(tally.class, ScriptValue::Object(entry));
        }
        ScriptValue::Object(result)
    }

    fn dump_heap(&mut self, strings: &mut dyn StringFactory, args: &[ScriptValue]) -> ProfilerResult<ScriptValue> {
        let Some(id) = self.target_id("dumpHeap", args.first())? else {
            return Ok(ScriptValue::Null);
        };
        let limit = self.config.max_dump_descriptors;
        let Some((dumped, truncated)) = self.inspector().dump_from(id, limit)? else {
            return Ok(ScriptValue::Null);
        };
        if truncated {
            tracing::warn!(%id, limit, "dumpHeap result truncated");
        }
        let result = ScriptObject::new();
        for (id, descriptor) in &dumped {
            result.set(id.to_string(), self.descriptor_object(strings, descriptor)?);
        }
        Ok(ScriptValue::Object(result))
    }
}

impl<T: TargetRuntime + ?Sized> HostFunctions for SessionBindings<'_, T> {
    fn call(
        &mut self,
        strings: &mut dyn StringFactory,
        name: &str,
        args: &[ScriptValue],
    ) -> ProfilerResult<ScriptValue> {
        self.calls += 1;
        tracing::trace!(op = name, args = args.len(), "host call");
        if !self.config.register_helpers && HELPER_OPERATIONS.contains(&name) {
            return Err(ProfilerError::usage(format!("{name} is not registered")));
        }
        match name {
            "getGCRoots" => {
                let roots = self.inspector().root_ids().into_iter().map(ScriptValue::from).collect();
                Ok(ScriptValue::Array(ScriptArray::from_vec(roots)))
            }
            "getObjectInfo" => self.get_object_info(strings, args),
            "getObjectParent" => self.get_object_parent(args),
            "getObjectProperties" => self.get_object_properties(strings, args),
            "getObjectProperty" => self.get_object_property(strings, args),
            "getNamedObjects" => self.get_named_objects(),
            "getObjectTable" => self.get_object_table(strings),
            "enumerate" => self.enumerate(strings, args),
            "functionInfo" => self.function_info(strings, args),
            "getClassTallies" => Ok(self.get_class_tallies()),
            "dumpHeap" => self.dump_heap(strings, args),
            other => Err(ProfilerError::usage(format!("no host operation named {other}"))),
        }
    }
}
