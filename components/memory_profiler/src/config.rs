//! Profiler configuration

use serde::{Deserialize, Serialize};

/// Tunables for profiling sessions.
///
/// # Examples
///
/// ```
/// use memory_profiler::ProfilerConfig;
///
/// let config = ProfilerConfig::default()
///     .with_initial_table_capacity(4096)
///     .with_helpers(false);
/// assert_eq!(config.initial_table_capacity, 4096);
/// assert!(!config.register_helpers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfilerConfig {
    /// Identifier table slots reserved before the heap walk
    pub initial_table_capacity: usize,
    /// Register `enumerate`, `functionInfo`, `getClassTallies` and `dumpHeap`
    pub register_helpers: bool,
    /// Most descriptors a single `dumpHeap` call returns
    pub max_dump_descriptors: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            initial_table_capacity: 100,
            register_helpers: true,
            max_dump_descriptors: 10_000,
        }
    }
}

impl ProfilerConfig {
    /// Set the identifier table's initial capacity.
    pub fn with_initial_table_capacity(mut self, capacity: usize) -> Self {
        self.initial_table_capacity = capacity;
        self
    }

    /// Choose whether auxiliary helpers are registered.
    pub fn with_helpers(mut self, register: bool) -> Self {
        self.register_helpers = register;
        self
    }

    /// Cap the size of a `dumpHeap` result.
    pub fn with_max_dump_descriptors(mut self, max: usize) -> Self {
        self.max_dump_descriptors = max;
        self
    }
}
