//! Records returned by inspector queries.
//!
//! Optional fields distinguish "not applicable" from "null": a field that
//! does not apply to an object is omitted entirely, both when serialized and
//! when handed to profiling script.

use std::time::Duration;

use core_types::{ObjectId, TargetString};
use serde::Serialize;

/// Everything the inspector reports about one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    /// Id of the object
    pub id: ObjectId,
    /// Native class name, when the target reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_class: Option<String>,
    /// Size in bytes
    pub size: usize,
    /// Parent object; omitted when there is none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    /// Prototype object; omitted when there is none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prototype: Option<ObjectId>,
    /// Wrapper links, only for extended classes
    #[serde(flatten)]
    pub wrapper: Option<WrapperDescriptor>,
    /// Function metadata, only for callables
    #[serde(flatten)]
    pub function: Option<FunctionMetadata>,
    /// Immediate children in trace order
    pub children: Vec<ObjectId>,
}

/// Wrapper relationships of an extended-class object.
///
/// Each link is omitted when the object has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperDescriptor {
    /// Object the wrapper stands in for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrapped_object: Option<ObjectId>,
    /// Outer half of a split object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_object: Option<ObjectId>,
    /// Inner half of a split object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_object: Option<ObjectId>,
}

/// Metadata of a callable object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMetadata {
    /// Declared name; omitted for anonymous functions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<TargetString>,
    /// Source file; omitted for native functions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<TargetString>,
    /// First source line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    /// Last source line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    /// Size of the function object
    pub function_size: usize,
    /// Size of the compiled script
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_size: Option<usize>,
}

/// Value of a property as seen by profiling script.
///
/// Only object identity and strings survive; every other value kind is
/// `Null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// An object; [`ObjectId::NONE`] when the heap walk never reached it
    Object(ObjectId),
    /// A string
    String(TargetString),
    /// Any other value
    Null,
}

/// Object count and total size for one native class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassTally {
    /// Class name, `"(none)"` for classless objects
    pub class: String,
    /// Number of objects
    pub count: usize,
    /// Sum of object sizes in bytes
    pub size: usize,
}

/// How a profiling session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// The script ran to completion
    Completed,
    /// Setup or evaluation failed
    Failed,
}

/// Summary of the most recent profiling session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Objects reached by the heap walk
    pub objects: usize,
    /// Distinct strings mirrored into the profiling context
    pub strings_mirrored: usize,
    /// Host operations the script invoked
    pub host_calls: usize,
    /// How the session ended
    pub outcome: SessionOutcome,
    /// Wall time from setup to teardown
    pub elapsed: Duration,
    /// Error message of a failed session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
