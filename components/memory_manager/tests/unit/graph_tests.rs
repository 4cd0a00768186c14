use std::collections::HashSet;

use core_types::{GcThing, HeapRef, TargetRuntime};
use memory_manager::Heap;
use proptest::prelude::*;

/// Builds a heap of `count` objects with the given edges, rooting object 0.
fn build(count: usize, edges: &[(usize, usize)]) -> (Heap, Vec<HeapRef>) {
    let mut heap = Heap::new();
    let refs: Vec<HeapRef> = (0..count).map(|_| heap.allocate_plain()).collect();
    for (i, (from, to)) in edges.iter().enumerate() {
        heap.set_property(refs[*from], &format!("p{i}"), refs[*to].into())
            .unwrap();
    }
    heap.add_object_root(refs[0], "root").unwrap();
    (heap, refs)
}

#[test]
fn test_self_reference_is_traced() {
    let (heap, refs) = build(1, &[(0, 0)]);
    let mut out = Vec::new();
    heap.trace_children(refs[0], &mut |t: GcThing| out.extend(t.as_object()));
    assert_eq!(out, vec![refs[0]]);
}

proptest! {
    #[test]
    fn prop_traced_children_match_edges(
        count in 1usize..20,
        raw_edges in proptest::collection::vec((0usize..20, 0usize..20), 0..40),
    ) {
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .map(|(a, b)| (a % count, b % count))
            .collect();
        let (heap, refs) = build(count, &edges);
        for (index, object) in refs.iter().enumerate() {
            let mut traced = Vec::new();
            heap.trace_children(*object, &mut |t: GcThing| traced.extend(t.as_object()));
            let expected: Vec<HeapRef> = edges
                .iter()
                .filter(|(from, _)| *from == index)
                .map(|(_, to)| refs[*to])
                .collect();
            prop_assert_eq!(traced, expected);
        }
        let unique: HashSet<HeapRef> = refs.iter().copied().collect();
        prop_assert_eq!(unique.len(), count);
    }
}
