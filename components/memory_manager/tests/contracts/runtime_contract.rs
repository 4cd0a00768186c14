//! Contract tests for the `TargetRuntime` implementation

use core_types::{GcThing, HeapRef, RootMapControl, TargetRuntime, TargetValue, WrapperLinks};
use memory_manager::{FunctionData, Heap, ObjectClass};

fn object_children(heap: &Heap, object: HeapRef) -> Vec<HeapRef> {
    let mut out = Vec::new();
    heap.trace_children(object, &mut |thing: GcThing| out.extend(thing.as_object()));
    out
}

#[test]
fn test_trace_roots_reports_every_root() {
    let mut heap = Heap::new();
    let a = heap.allocate_plain();
    let b = heap.allocate_plain();
    heap.add_object_root(a, "a").unwrap();
    heap.add_root(b.into(), None).unwrap();
    let name = heap.string("rooted");
    heap.add_root(name, Some("string")).unwrap();

    let mut things = Vec::new();
    heap.trace_roots(&mut |thing: GcThing| things.push(thing));
    assert_eq!(things.len(), 3);
    assert_eq!(things[0].as_object(), Some(a));
    assert_eq!(things[1].as_object(), Some(b));
    assert!(things[2].as_object().is_none());
}

#[test]
fn test_map_gc_roots_carries_names() {
    let mut heap = Heap::new();
    let a = heap.allocate_plain();
    heap.add_object_root(a, "global").unwrap();
    heap.add_root(a.into(), None).unwrap();

    let mut names = Vec::new();
    heap.map_gc_roots(&mut |root| {
        names.push(root.name.map(str::to_owned));
        RootMapControl::Next
    });
    assert_eq!(names, vec![Some("global".to_owned()), None]);
}

#[test]
fn test_empty_object_has_no_children() {
    let mut heap = Heap::new();
    let empty = heap.allocate_plain();
    assert!(object_children(&heap, empty).is_empty());
    assert!(heap.enumerate_keys(empty).unwrap().is_empty());
    assert!(heap.property_entries(empty).unwrap().is_empty());
}

#[test]
fn test_wrapper_links_are_traced() {
    let mut heap = Heap::new();
    let inner = heap.allocate_plain();
    let outer = heap.allocate(ObjectClass::extended("Window"));
    heap.set_wrapper_links(
        outer,
        WrapperLinks {
            inner: Some(inner),
            ..WrapperLinks::default()
        },
    )
    .unwrap();
    assert_eq!(object_children(&heap, outer), vec![inner]);
    assert_eq!(heap.wrapper_links(outer).inner, Some(inner));
    assert_eq!(heap.class_of(outer).map(|c| c.extended), Some(true));
}

#[test]
fn test_getter_is_a_traced_edge() {
    let mut heap = Heap::new();
    let getter = heap.allocate_function(FunctionData::native(None));
    let obj = heap.allocate_plain();
    heap.define_getter(obj, "value", getter, true).unwrap();
    assert_eq!(object_children(&heap, obj), vec![getter]);
}

#[test]
fn test_size_and_class() {
    let mut heap = Heap::new();
    let obj = heap.allocate(ObjectClass::new("Array"));
    heap.set_element(obj, 0, TargetValue::Number(1.0)).unwrap();
    heap.set_extra_bytes(obj, 100).unwrap();
    assert_eq!(heap.class_of(obj).map(|c| c.name), Some("Array"));
    assert_eq!(heap.object_size(obj), 32 + 16 + 100);

    let classless = heap.allocate_classless();
    assert!(heap.class_of(classless).is_none());
    assert_eq!(heap.lookup_property(obj, "0").unwrap(), Some(TargetValue::Number(1.0)));
}

#[test]
fn test_parent_and_prototype() {
    let mut heap = Heap::new();
    let proto = heap.allocate_plain();
    let scope = heap.allocate(ObjectClass::new("Call"));
    let obj = heap.allocate_plain();
    heap.set_prototype(obj, Some(proto)).unwrap();
    heap.set_parent(obj, Some(scope)).unwrap();
    assert_eq!(heap.prototype_of(obj), Some(proto));
    assert_eq!(heap.parent_of(obj), Some(scope));
    assert_eq!(heap.parent_of(proto), None);
}
