//! Zero-copy string mirroring
//!
//! Target strings cross into the profiling context as external strings that
//! alias the target's character storage. Each target allocation is mirrored
//! at most once per session; the mirror also keeps every mirrored string and
//! its target alive until the session releases it.

use std::collections::HashMap;

use core_types::{
    ProfilerError, ProfilerResult, ScriptString, StringFactory, StringIdentity, TargetString,
};

fn mirror_oom() -> ProfilerError {
    ProfilerError::out_of_memory("mirroring a string")
}

#[derive(Debug)]
struct MirrorEntry {
    /// Holds the target allocation so its identity cannot be reused
    _target: TargetString,
    mirrored: ScriptString,
}

/// Dedup table from target string identity to mirrored string.
#[derive(Debug, Default)]
pub struct StringMirror {
    entries: HashMap<StringIdentity, MirrorEntry>,
    keep_alive: Vec<ScriptString>,
}

impl StringMirror {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror `target` into the context behind `strings`.
    ///
    /// Returns the existing mirror when this allocation has been mirrored
    /// before.
    pub fn mirror(
        &mut self,
        strings: &mut dyn StringFactory,
        target: &TargetString,
    ) -> ProfilerResult<ScriptString> {
        let identity = target.identity();
        if let Some(entry) = self.entries.get(&identity) {
            return Ok(entry.mirrored.clone());
        }
        self.entries.try_reserve(1).map_err(|_| mirror_oom())?;
        self.keep_alive.try_reserve(1).map_err(|_| mirror_oom())?;
        let mirrored = strings.external_string(target.chars())?;
        self.keep_alive.push(mirrored.clone());
        self.entries.insert(
            identity,
            MirrorEntry {
                _target: target.clone(),
                mirrored: mirrored.clone(),
            },
        );
        Ok(mirrored)
    }

    /// Number of distinct strings mirrored.
    pub fn len(&self) -> usize {
        self.keep_alive.len()
    }

    /// Returns true if nothing has been mirrored.
    pub fn is_empty(&self) -> bool {
        self.keep_alive.is_empty()
    }

    /// Drop the keep-alive collection and the dedup table.
    pub fn release(&mut self) {
        self.keep_alive = Vec::new();
        self.entries = HashMap::new();
    }
}
