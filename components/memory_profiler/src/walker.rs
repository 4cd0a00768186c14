//! Child enumeration over a completed identifier table

use core_types::{GcThing, HeapRef, ObjectId, ProfilerError, ProfilerResult, TargetRuntime};

use crate::id_table::IdentifierTable;

/// Resolves the immediate children of tracked objects.
#[derive(Debug)]
pub struct HeapWalker<'a, T: ?Sized> {
    target: &'a T,
    table: &'a IdentifierTable,
}

impl<'a, T: TargetRuntime + ?Sized> HeapWalker<'a, T> {
    /// Create a walker over `table`, which must be fully built.
    pub fn new(target: &'a T, table: &'a IdentifierTable) -> Self {
        Self { target, table }
    }

    /// Ids of the objects `id` references, in trace order.
    ///
    /// Non-object edges are skipped and repeated edges are kept. Returns
    /// `Ok(None)` for an unknown id. A child missing from the table means the
    /// heap walk and the target disagree, which is a
    /// [`ProfilerError::ConsistencyViolation`].
    pub fn trace_children(&self, id: ObjectId) -> ProfilerResult<Option<Vec<ObjectId>>> {
        let Some(object) = self.table.lookup_ref(id) else {
            return Ok(None);
        };
        self.children_of(object, id).map(Some)
    }

    pub(crate) fn children_of(&self, object: HeapRef, id: ObjectId) -> ProfilerResult<Vec<ObjectId>> {
        let mut children = Vec::new();
        let mut missing = None;
        self.target.trace_children(object, &mut |thing: GcThing| {
            let GcThing::Object(child) = thing else {
                return;
            };
            let child_id = self.table.lookup_id(child);
            if child_id.is_none() {
                missing.get_or_insert(child);
            } else {
                children.push(child_id);
            }
        });
        if let Some(child) = missing {
            tracing::error!(%id, %child, "traced child missing from identifier table");
            return Err(ProfilerError::ConsistencyViolation(format!(
                "object {id} references {child}, which the heap walk never reached"
            )));
        }
        Ok(children)
    }
}
