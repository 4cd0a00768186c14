use std::collections::HashSet;

use core_types::{HeapRef, ObjectId, TargetRuntime};
use memory_manager::Heap;
use memory_profiler::{HeapWalker, IdentifierTable, Inspector};
use proptest::prelude::*;

/// Heap of `count` objects wired by `edges`; the listed objects are rooted.
fn build(count: usize, edges: &[(usize, usize)], roots: &[usize]) -> (Heap, Vec<HeapRef>) {
    let mut heap = Heap::new();
    let refs: Vec<HeapRef> = (0..count).map(|_| heap.allocate_plain()).collect();
    for (i, (from, to)) in edges.iter().enumerate() {
        heap.set_property(refs[*from], &format!("p{i}"), refs[*to].into())
            .unwrap();
    }
    for (i, root) in roots.iter().enumerate() {
        heap.add_object_root(refs[*root], &format!("root{i}")).unwrap();
    }
    (heap, refs)
}

fn walked(heap: &Heap) -> IdentifierTable {
    let mut table = IdentifierTable::with_capacity(4).unwrap();
    table.assign_ids(heap).unwrap();
    table.build_reverse_index().unwrap();
    table
}

/// Objects reachable from the roots, computed independently of the table.
fn reachable(heap: &Heap, roots: &[HeapRef]) -> HashSet<HeapRef> {
    let mut seen: HashSet<HeapRef> = roots.iter().copied().collect();
    let mut pending: Vec<HeapRef> = roots.to_vec();
    while let Some(next) = pending.pop() {
        heap.trace_children(next, &mut |thing: core_types::GcThing| {
            if let Some(child) = thing.as_object() {
                if seen.insert(child) {
                    pending.push(child);
                }
            }
        });
    }
    seen
}

#[test]
fn test_first_visit_order() {
    let (heap, refs) = build(3, &[(0, 1), (1, 2)], &[0]);
    let table = walked(&heap);
    let ids: Vec<u32> = refs.iter().map(|r| table.lookup_id(*r).get()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_unrooted_objects_are_not_tracked() {
    let (heap, refs) = build(3, &[(0, 1)], &[0]);
    let table = walked(&heap);
    assert_eq!(table.len(), 2);
    assert!(table.lookup_id(refs[2]).is_none());
}

proptest! {
    #[test]
    fn prop_ids_are_a_bijection_over_reachable_objects(
        count in 1usize..24,
        raw_edges in proptest::collection::vec((0usize..24, 0usize..24), 0..48),
        raw_roots in proptest::collection::vec(0usize..24, 1..4),
    ) {
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .map(|(a, b)| (a % count, b % count))
            .collect();
        let roots: Vec<usize> = raw_roots.into_iter().map(|r| r % count).collect();
        let (heap, refs) = build(count, &edges, &roots);
        let table = walked(&heap);

        let root_refs: Vec<HeapRef> = roots.iter().map(|r| refs[*r]).collect();
        let live = reachable(&heap, &root_refs);
        prop_assert_eq!(table.len(), live.len());

        let mut seen_ids = HashSet::new();
        for object in &refs {
            let id = table.lookup_id(*object);
            if live.contains(object) {
                prop_assert!(!id.is_none());
                prop_assert!(seen_ids.insert(id));
                prop_assert_eq!(table.lookup_ref(id), Some(*object));
                prop_assert_eq!(table.lookup_id(table.lookup_ref(id).unwrap()), id);
            } else {
                prop_assert!(id.is_none());
            }
        }
        prop_assert!(table.lookup_ref(ObjectId::NONE).is_none());
        prop_assert!(table.lookup_ref(ObjectId::new(table.len() as u32 + 1)).is_none());
    }

    #[test]
    fn prop_object_table_keys_are_dense(
        count in 1usize..24,
        raw_edges in proptest::collection::vec((0usize..24, 0usize..24), 0..48),
    ) {
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .map(|(a, b)| (a % count, b % count))
            .collect();
        let (heap, _) = build(count, &edges, &[0]);
        let table = walked(&heap);
        let inspector = Inspector::new(&heap, &table);

        let keys: Vec<u32> = inspector.object_table().iter().map(|(id, _)| id.get()).collect();
        let expected: Vec<u32> = (1..=table.len() as u32).collect();
        prop_assert_eq!(keys, expected);

        let walker = HeapWalker::new(&heap, &table);
        for id in table.ids() {
            let children = walker.trace_children(id).unwrap().unwrap();
            prop_assert!(children.iter().all(|c| !c.is_none()));
        }
        for root in inspector.root_ids() {
            prop_assert!(table.lookup_ref(root).is_some());
        }
    }
}
