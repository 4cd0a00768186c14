//! Handles for target heap objects and the ids exposed to profiling script.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Opaque handle to a live object in the target runtime.
///
/// The profiler never looks inside a `HeapRef`. It is only hashed, compared
/// and handed back to the [`TargetRuntime`](crate::TargetRuntime) that
/// produced it. A handle is only meaningful for the duration of one
/// profiling session.
///
/// # Examples
///
/// ```
/// use core_types::HeapRef;
///
/// let handle = HeapRef::from_raw(42).unwrap();
/// assert_eq!(handle.raw(), 42);
/// assert!(HeapRef::from_raw(0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(NonZeroU64);

impl HeapRef {
    /// Wraps a non-zero native handle.
    pub const fn new(raw: NonZeroU64) -> Self {
        HeapRef(raw)
    }

    /// Wraps a native handle, rejecting the null handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(HeapRef)
    }

    /// Returns the native handle value.
    pub const fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Dense identifier assigned to a heap object during the heap walk.
///
/// Ids run from `1` to `N` where `N` is the number of objects visited.
/// [`ObjectId::NONE`] (zero) means "no object" and is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u32);

impl ObjectId {
    /// The reserved "no object" id.
    pub const NONE: ObjectId = ObjectId(0);

    /// Creates an id from its integer value.
    pub const fn new(raw: u32) -> Self {
        ObjectId(raw)
    }

    /// Returns the integer value of this id.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns true for the reserved "no object" id.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Index of this id in a dense table where slot 0 is unused.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Converts a script number into an id.
    ///
    /// Only non-negative integers that fit in 32 bits are ids; anything else
    /// yields `None`.
    pub fn from_number(n: f64) -> Option<Self> {
        if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
            Some(ObjectId(n as u32))
        } else {
            None
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
