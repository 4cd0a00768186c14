//! Allocation accounting for a profiling context
//!
//! A context never frees memory while a script runs, so the budget counts
//! every byte charged over the context's lifetime. Exceeding the limit is an
//! out-of-memory condition the script can catch.

use core_types::{ProfilerError, ProfilerResult, ScriptValue};

/// Bytes charged for a string header.
pub const STRING_HEADER_SIZE: usize = 16;
/// Bytes charged for an array header.
pub const ARRAY_HEADER_SIZE: usize = 16;
/// Bytes charged per array element.
pub const ELEMENT_SIZE: usize = 8;
/// Bytes charged for an object header.
pub const OBJECT_HEADER_SIZE: usize = 32;
/// Bytes charged per object property.
pub const PROPERTY_SIZE: usize = 16;
/// Bytes charged for a closure.
pub const CLOSURE_SIZE: usize = 64;

/// Running total of bytes charged against a fixed limit.
#[derive(Debug, Clone)]
pub struct AllocationBudget {
    limit: usize,
    used: usize,
}

impl AllocationBudget {
    /// Create a budget allowing `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    /// Charge `bytes`, failing without charging if the limit would be passed.
    pub fn charge(&mut self, bytes: usize, what: &str) -> ProfilerResult<()> {
        match self.used.checked_add(bytes) {
            Some(total) if total <= self.limit => {
                self.used = total;
                Ok(())
            }
            _ => {
                tracing::debug!(used = self.used, limit = self.limit, bytes, "allocation budget exhausted");
                Err(ProfilerError::out_of_memory(what))
            }
        }
    }

    /// Charge the shallow footprint of a value handed in from outside the
    /// evaluator.
    pub fn charge_value(&mut self, value: &ScriptValue) -> ProfilerResult<()> {
        let bytes = match value {
            ScriptValue::String(s) if !s.is_external() => STRING_HEADER_SIZE + s.len(),
            ScriptValue::Array(a) => ARRAY_HEADER_SIZE + ELEMENT_SIZE * a.len(),
            ScriptValue::Object(o) => OBJECT_HEADER_SIZE + PROPERTY_SIZE * o.len(),
            _ => 0,
        };
        self.charge(bytes, "storing a host result")
    }

    /// Bytes charged so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Maximum bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes left before the limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.used
    }
}
