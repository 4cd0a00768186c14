//! Identifier table
//!
//! Maps target heap handles to the dense ids handed to profiling script and
//! back. The forward map is filled by exactly one reachability walk from the
//! full root set; the dense reverse index is built from it once the walk is
//! over. Neither is touched again until the session releases them.

use std::collections::HashMap;

use core_types::{GcThing, HeapRef, ObjectId, ProfilerError, ProfilerResult, TargetRuntime, Tracer};

fn table_oom() -> ProfilerError {
    ProfilerError::out_of_memory("growing the identifier table")
}

/// Bidirectional `HeapRef` / [`ObjectId`] mapping for one session.
#[derive(Debug, Default)]
pub struct IdentifierTable {
    ids: HashMap<HeapRef, ObjectId>,
    /// Slot 0 is always `None`
    refs: Vec<Option<HeapRef>>,
}

impl IdentifierTable {
    /// Create an empty table with room for `capacity` objects.
    pub fn with_capacity(capacity: usize) -> ProfilerResult<Self> {
        let mut ids = HashMap::new();
        ids.try_reserve(capacity).map_err(|_| table_oom())?;
        Ok(Self { ids, refs: Vec::new() })
    }

    /// Walk everything reachable from the target's root set, giving each
    /// object the next id in first-visit order.
    ///
    /// The walk is depth-first over an explicit pending stack. On failure the
    /// table is cleared; a partial table is never left behind.
    pub fn assign_ids<T: TargetRuntime + ?Sized>(&mut self, target: &T) -> ProfilerResult<()> {
        let result = self.walk(target);
        if result.is_err() {
            self.release();
        }
        result
    }

    fn walk<T: TargetRuntime + ?Sized>(&mut self, target: &T) -> ProfilerResult<()> {
        let mut assigner = IdAssigner {
            table: self,
            pending: Vec::new(),
            error: None,
        };
        target.trace_roots(&mut assigner);
        while let Some(next) = assigner.pending.pop() {
            if assigner.error.is_some() {
                break;
            }
            target.trace_children(next, &mut assigner);
        }
        if let Some(error) = assigner.error {
            return Err(error);
        }
        tracing::debug!(objects = self.ids.len(), "heap walk complete");
        Ok(())
    }

    /// Allocate the next id for an unseen object.
    fn insert(&mut self, object: HeapRef) -> ProfilerResult<ObjectId> {
        let next = u32::try_from(self.ids.len() + 1).map_err(|_| table_oom())?;
        self.ids.try_reserve(1).map_err(|_| table_oom())?;
        let id = ObjectId::new(next);
        self.ids.insert(object, id);
        Ok(id)
    }

    /// Build the dense id-to-handle index from the forward map.
    pub fn build_reverse_index(&mut self) -> ProfilerResult<()> {
        let mut refs = Vec::new();
        refs.try_reserve_exact(self.ids.len() + 1).map_err(|_| table_oom())?;
        refs.resize(self.ids.len() + 1, None);
        for (&object, &id) in &self.ids {
            refs[id.index()] = Some(object);
        }
        self.refs = refs;
        Ok(())
    }

    /// Id of `object`, or [`ObjectId::NONE`] if the walk never reached it.
    pub fn lookup_id(&self, object: HeapRef) -> ObjectId {
        self.ids.get(&object).copied().unwrap_or(ObjectId::NONE)
    }

    /// Handle for `id`; `None` for id 0 or past the last id.
    pub fn lookup_ref(&self, id: ObjectId) -> Option<HeapRef> {
        self.refs.get(id.index()).copied().flatten()
    }

    /// Number of objects visited.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the walk found nothing.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Every assigned id, `1..=N`.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> {
        // len() fits in u32: insert refuses to grow past it.
        (1..=self.ids.len() as u32).map(ObjectId::new)
    }

    /// Drop both directions of the mapping.
    pub fn release(&mut self) {
        self.ids = HashMap::new();
        self.refs = Vec::new();
    }
}

/// Tracer that numbers newly seen objects and queues them for a visit.
struct IdAssigner<'a> {
    table: &'a mut IdentifierTable,
    pending: Vec<HeapRef>,
    error: Option<ProfilerError>,
}

impl Tracer for IdAssigner<'_> {
    fn trace(&mut self, thing: GcThing) {
        let GcThing::Object(object) = thing else {
            return;
        };
        if self.error.is_some() || self.table.ids.contains_key(&object) {
            return;
        }
        let queued = self
            .pending
            .try_reserve(1)
            .map_err(|_| table_oom())
            .and_then(|()| self.table.insert(object));
        match queued {
            Ok(_) => self.pending.push(object),
            Err(error) => self.error = Some(error),
        }
    }
}
