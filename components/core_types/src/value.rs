//! Values on both sides of the profiling boundary.
//!
//! [`TargetValue`] is what the target runtime hands out; the profiler only
//! ever turns it into an [`ObjectId`] or a mirrored [`ScriptString`].
//! [`ScriptValue`] is the value model of a profiling context. The two never
//! mix: every crossing goes through the identifier table or the string
//! mirror.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::{HeapRef, ObjectId};

/// A string owned by the target runtime.
///
/// Identity is the allocation, not the contents: two target strings with
/// the same characters may have different identities.
///
/// # Examples
///
/// ```
/// use core_types::TargetString;
///
/// let a = TargetString::new("name");
/// let b = a.clone();
/// let c = TargetString::new("name");
/// assert_eq!(a.identity(), b.identity());
/// assert_ne!(a.identity(), c.identity());
/// assert_eq!(a, c);
/// ```
#[derive(Clone)]
pub struct TargetString(Arc<str>);

impl TargetString {
    /// Creates a target string from its backing characters.
    pub fn new(chars: impl Into<Arc<str>>) -> Self {
        TargetString(chars.into())
    }

    /// Returns the characters.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the shared backing storage.
    pub fn chars(&self) -> &Arc<str> {
        &self.0
    }

    /// Identity of the backing allocation.
    pub fn identity(&self) -> StringIdentity {
        StringIdentity(Arc::as_ptr(&self.0) as *const u8 as usize)
    }

    /// Returns true if both handles share backing storage.
    pub fn ptr_eq(&self, other: &TargetString) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TargetString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for TargetString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetString").field(&self.as_str()).finish()
    }
}

impl Serialize for TargetString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Identity of a target string's backing allocation.
///
/// Only valid while the string is alive, which a session guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringIdentity(usize);

/// A value as reported by the target runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValue {
    /// undefined
    Undefined,
    /// null
    Null,
    /// A boolean
    Boolean(bool),
    /// A number
    Number(f64),
    /// A string owned by the target runtime
    String(TargetString),
    /// A heap object
    Object(HeapRef),
}

impl TargetValue {
    /// Returns the object handle if this value is an object.
    pub fn as_object(&self) -> Option<HeapRef> {
        match self {
            TargetValue::Object(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<HeapRef> for TargetValue {
    fn from(object: HeapRef) -> Self {
        TargetValue::Object(object)
    }
}

impl From<TargetString> for TargetValue {
    fn from(s: TargetString) -> Self {
        TargetValue::String(s)
    }
}

enum StringRepr {
    Owned(Box<str>),
    External(Arc<str>),
}

/// A string living in a profiling context.
///
/// Either owns its characters or aliases storage owned by someone else
/// (an *external* string). Cloning shares the same instance.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use core_types::ScriptString;
///
/// let chars: Arc<str> = Arc::from("borrowed");
/// let external = ScriptString::external(chars.clone());
/// assert!(external.is_external());
/// assert!(external.aliases(&chars));
///
/// let owned = ScriptString::from("borrowed");
/// assert!(!owned.is_external());
/// assert_eq!(owned, external);
/// assert!(!ScriptString::ptr_eq(&owned, &external));
/// ```
#[derive(Clone)]
pub struct ScriptString(Rc<StringRepr>);

impl ScriptString {
    /// Creates a string that owns its characters.
    pub fn owned(chars: impl Into<Box<str>>) -> Self {
        ScriptString(Rc::new(StringRepr::Owned(chars.into())))
    }

    /// Creates a string that aliases `chars` without copying.
    pub fn external(chars: Arc<str>) -> Self {
        ScriptString(Rc::new(StringRepr::External(chars)))
    }

    /// Returns the characters.
    pub fn as_str(&self) -> &str {
        match &*self.0 {
            StringRepr::Owned(s) => s,
            StringRepr::External(s) => s,
        }
    }

    /// Returns true if this string aliases storage it does not own.
    pub fn is_external(&self) -> bool {
        matches!(&*self.0, StringRepr::External(_))
    }

    /// Returns true if this is an external string over exactly `chars`.
    pub fn aliases(&self, chars: &Arc<str>) -> bool {
        match &*self.0 {
            StringRepr::External(s) => Arc::ptr_eq(s, chars),
            StringRepr::Owned(_) => false,
        }
    }

    /// Returns true if both handles are the same string instance.
    pub fn ptr_eq(a: &ScriptString, b: &ScriptString) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    /// Returns true for the empty string.
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl PartialEq for ScriptString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ScriptString {}

impl AsRef<str> for ScriptString {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for ScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ScriptString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ScriptString {
    fn from(s: &str) -> Self {
        ScriptString::owned(s)
    }
}

impl From<String> for ScriptString {
    fn from(s: String) -> Self {
        ScriptString::owned(s)
    }
}

#[derive(Default)]
struct ObjectData {
    properties: IndexMap<String, ScriptValue>,
    sealed: bool,
}

/// A property bag in a profiling context.
///
/// Keys keep insertion order. A sealed object rejects every write.
#[derive(Clone, Default)]
pub struct ScriptObject(Rc<RefCell<ObjectData>>);

impl ScriptObject {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an own property.
    pub fn get(&self, key: &str) -> Option<ScriptValue> {
        self.0.borrow().properties.get(key).cloned()
    }

    /// Writes a property; returns false if the object is sealed.
    pub fn set(&self, key: impl Into<String>, value: ScriptValue) -> bool {
        let mut data = self.0.borrow_mut();
        if data.sealed {
            return false;
        }
        data.properties.insert(key.into(), value);
        true
    }

    /// Returns true if the object has an own property named `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().properties.contains_key(key)
    }

    /// Own property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().properties.keys().cloned().collect()
    }

    /// Own properties in insertion order.
    pub fn entries(&self) -> Vec<(String, ScriptValue)> {
        self.0
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of own properties.
    pub fn len(&self) -> usize {
        self.0.borrow().properties.len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes the object read-only.
    pub fn seal(&self) {
        self.0.borrow_mut().sealed = true;
    }

    /// Returns true once [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.0.borrow().sealed
    }

    /// Returns true if both handles are the same object.
    pub fn ptr_eq(a: &ScriptObject, b: &ScriptObject) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptObject({} properties)", self.len())
    }
}

#[derive(Default)]
struct ArrayData {
    elements: Vec<ScriptValue>,
    sealed: bool,
}

/// An array in a profiling context.
#[derive(Clone, Default)]
pub struct ScriptArray(Rc<RefCell<ArrayData>>);

impl ScriptArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array holding `elements`.
    pub fn from_vec(elements: Vec<ScriptValue>) -> Self {
        ScriptArray(Rc::new(RefCell::new(ArrayData {
            elements,
            sealed: false,
        })))
    }

    /// Reads an element.
    pub fn get(&self, index: usize) -> Option<ScriptValue> {
        self.0.borrow().elements.get(index).cloned()
    }

    /// Writes an element, padding with `undefined`; returns false if sealed.
    pub fn set(&self, index: usize, value: ScriptValue) -> bool {
        let mut data = self.0.borrow_mut();
        if data.sealed {
            return false;
        }
        if index >= data.elements.len() {
            data.elements.resize(index + 1, ScriptValue::Undefined);
        }
        data.elements[index] = value;
        true
    }

    /// Appends an element; returns false if sealed.
    pub fn push(&self, value: ScriptValue) -> bool {
        let mut data = self.0.borrow_mut();
        if data.sealed {
            return false;
        }
        data.elements.push(value);
        true
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.0.borrow().elements.len()
    }

    /// Returns true if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the elements out.
    pub fn to_vec(&self) -> Vec<ScriptValue> {
        self.0.borrow().elements.clone()
    }

    /// Makes the array read-only.
    pub fn seal(&self) {
        self.0.borrow_mut().sealed = true;
    }

    /// Returns true once [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.0.borrow().sealed
    }

    /// Returns true if both handles are the same array.
    pub fn ptr_eq(a: &ScriptArray, b: &ScriptArray) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for ScriptArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptArray({} elements)", self.len())
    }
}

/// Where a callable value's implementation lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// An operation supplied through [`HostFunctions`](crate::HostFunctions)
    Host,
    /// A builtin of the profiling runtime
    Builtin(u32),
    /// A native installed by the embedder of the profiling runtime
    Native(u32),
    /// A function defined by profiling script
    Script(u32),
}

/// A callable value in a profiling context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHandle {
    name: Rc<str>,
    kind: FunctionKind,
}

impl FunctionHandle {
    /// Creates a handle.
    pub fn new(name: &str, kind: FunctionKind) -> Self {
        Self {
            name: Rc::from(name),
            kind,
        }
    }

    /// Name the function was bound under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the implementation lives.
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }
}

/// A value in a profiling context.
///
/// # Examples
///
/// ```
/// use core_types::{ObjectId, ScriptValue};
///
/// let id: ScriptValue = ObjectId::new(5).into();
/// assert_eq!(id, ScriptValue::Number(5.0));
/// assert!(!ScriptValue::Null.is_truthy());
/// assert_eq!(ScriptValue::Null.type_of(), "object");
/// ```
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// A boolean
    Boolean(bool),
    /// A number
    Number(f64),
    /// A string
    String(ScriptString),
    /// An array
    Array(ScriptArray),
    /// A plain object
    Object(ScriptObject),
    /// A callable value
    Function(FunctionHandle),
}

impl ScriptValue {
    /// The result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Function(_) => "function",
            ScriptValue::Null | ScriptValue::Array(_) | ScriptValue::Object(_) => "object",
        }
    }

    /// Truthiness used by conditions and logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            ScriptValue::Undefined | ScriptValue::Null => false,
            ScriptValue::Boolean(b) => *b,
            ScriptValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ScriptValue::String(s) => !s.is_empty(),
            ScriptValue::Array(_) | ScriptValue::Object(_) | ScriptValue::Function(_) => true,
        }
    }

    /// Returns true for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    /// Returns the number if this value is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the characters if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the object if this value is a plain object.
    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            ScriptValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns the array if this value is one.
    pub fn as_array(&self) -> Option<&ScriptArray> {
        match self {
            ScriptValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Strict equality: primitives by value, everything else by identity.
    pub fn strict_equals(&self, other: &ScriptValue) -> bool {
        match (self, other) {
            (ScriptValue::Undefined, ScriptValue::Undefined) => true,
            (ScriptValue::Null, ScriptValue::Null) => true,
            (ScriptValue::Boolean(a), ScriptValue::Boolean(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Array(a), ScriptValue::Array(b)) => ScriptArray::ptr_eq(a, b),
            (ScriptValue::Object(a), ScriptValue::Object(b)) => ScriptObject::ptr_eq(a, b),
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Boolean(b)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(ScriptString::from(s))
    }
}

impl From<ScriptString> for ScriptValue {
    fn from(s: ScriptString) -> Self {
        ScriptValue::String(s)
    }
}

impl From<ObjectId> for ScriptValue {
    fn from(id: ObjectId) -> Self {
        ScriptValue::Number(f64::from(id.get()))
    }
}
