use hashbrown::HashMap;

use crate::memory::{GarbageCollector, GcConfig, Generation, Roots};
use crate::objects::Value;

/// A configuration with tiny thresholds, so tests can force frequent
/// collection cycles with only a handful of objects.
fn small_heap() -> GarbageCollector {
    GarbageCollector::with_config(GcConfig {
        threshold_young: 256,
        threshold_old: 512,
        grow_young: 1,
        grow_old: 1,
    })
}

#[test]
fn unreachable_young_objects_are_freed() {
    let mut gc = GarbageCollector::new();

    for i in 0..10 {
        gc.alloc_string(format!("garbage-{}", i), None);
    }

    assert_eq!(gc.object_count(), 10);

    let stack: Vec<Value> = vec![];
    let globals: HashMap<String, Value> = HashMap::new();
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });

    assert_eq!(gc.object_count(), 0);
    assert_eq!(gc.bytes_young(), 0);
    assert_eq!(gc.bytes_old(), 0);
}

#[test]
fn stack_rooted_objects_survive() {
    let mut gc = GarbageCollector::new();

    let keep = gc.alloc_string(String::from("keep"), None);
    gc.alloc_string(String::from("drop"), None);

    let stack = vec![Value::Obj(keep)];
    let globals: HashMap<String, Value> = HashMap::new();
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });

    assert_eq!(gc.object_count(), 1);
    assert_eq!(gc.get(&keep).obj.as_str_obj().unwrap().text, "keep");
}

#[test]
fn global_rooted_objects_survive() {
    let mut gc = GarbageCollector::new();

    let keep = gc.alloc_string(String::from("keep"), None);

    let stack: Vec<Value> = vec![];
    let mut globals: HashMap<String, Value> = HashMap::new();
    globals.insert(String::from("g"), Value::Obj(keep));

    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });

    assert_eq!(gc.object_count(), 1);
}

#[test]
fn no_marks_remain_after_a_cycle() {
    let mut gc = GarbageCollector::new();

    let a = gc.alloc_string(String::from("a"), None);
    let b = gc.alloc_string(String::from("b"), None);

    let stack = vec![Value::Obj(a), Value::Obj(b)];
    let globals: HashMap<String, Value> = HashMap::new();
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });

    assert!(!gc.get(&a).header.marked);
    assert!(!gc.get(&b).header.marked);
}

#[test]
fn survivors_are_promoted_after_two_cycles() {
    let mut gc = GarbageCollector::new();

    let id = gc.alloc_string(String::from("durable"), None);
    let stack = vec![Value::Obj(id)];
    let globals: HashMap<String, Value> = HashMap::new();

    assert_eq!(gc.get(&id).header.generation, Generation::Young);

    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });
    assert_eq!(gc.get(&id).header.generation, Generation::Young);
    assert_eq!(gc.get(&id).header.age, 1);

    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });
    assert_eq!(gc.get(&id).header.generation, Generation::Old);
    assert_eq!(gc.bytes_young(), 0);
    assert!(gc.bytes_old() > 0);
}

#[test]
fn young_cycles_leave_the_old_generation_alone() {
    let mut gc = GarbageCollector::new();

    // Promote one object into the old generation, then drop the root.
    let id = gc.alloc_string(String::from("tenured"), None);
    let stack = vec![Value::Obj(id)];
    let globals: HashMap<String, Value> = HashMap::new();

    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });
    assert_eq!(gc.get(&id).header.generation, Generation::Old);

    // Unreachable now, but the old generation is under its threshold so
    // a young-only cycle must not free it.
    let empty: Vec<Value> = vec![];
    gc.collect(&Roots {
        stack: &empty,
        globals: &globals,
    });

    assert_eq!(gc.object_count(), 1);
}

#[test]
fn full_cycles_reclaim_unreachable_old_objects() {
    let mut gc = GarbageCollector::with_config(GcConfig {
        threshold_young: 256,
        // Anything in the old generation puts it over threshold.
        threshold_old: 0,
        grow_young: 1,
        grow_old: 1,
    });

    let id = gc.alloc_string(String::from("tenured"), None);
    let stack = vec![Value::Obj(id)];
    let globals: HashMap<String, Value> = HashMap::new();

    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });
    assert_eq!(gc.get(&id).header.generation, Generation::Old);

    let empty: Vec<Value> = vec![];
    gc.collect(&Roots {
        stack: &empty,
        globals: &globals,
    });

    assert_eq!(gc.object_count(), 0);
    assert_eq!(gc.bytes_old(), 0);
}

#[test]
fn instances_keep_their_class_name_and_fields_alive() {
    let mut gc = GarbageCollector::new();

    let name = gc.alloc_string(String::from("Box"), None);
    let class = gc.alloc_class(name, None);
    let instance = gc.alloc_instance(class, None);
    let field = gc.alloc_string(String::from("payload"), None);

    gc.get_mut(&instance)
        .obj
        .as_instance_obj_mut()
        .unwrap()
        .fields
        .insert(String::from("data"), Value::Obj(field));

    // Only the instance is rooted; everything else must survive
    // through tracing.
    let stack = vec![Value::Obj(instance)];
    let globals: HashMap<String, Value> = HashMap::new();
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });

    assert_eq!(gc.object_count(), 4);
    assert_eq!(gc.get(&field).obj.as_str_obj().unwrap().text, "payload");
}

#[test]
fn freed_slots_are_reused_for_new_objects() {
    let mut gc = GarbageCollector::new();

    let dropped = gc.alloc_string(String::from("dropped"), None);

    let stack: Vec<Value> = vec![];
    let globals: HashMap<String, Value> = HashMap::new();
    gc.collect(&Roots {
        stack: &stack,
        globals: &globals,
    });

    let replacement = gc.alloc_string(String::from("replacement"), None);
    assert_eq!(dropped.0, replacement.0);
}

#[test]
fn allocation_objects_report_their_block_size() {
    let mut gc = GarbageCollector::new();

    let id = gc.alloc_allocation(3, None);
    let block = gc.get(&id).obj.as_allocation_obj().unwrap();

    assert_eq!(block.kilobytes, 3);
    assert_eq!(block.block.len(), 3 * 1024);
}

#[test]
fn byte_counter_grows_monotonically_between_collections() {
    let mut gc = GarbageCollector::new();

    let mut last = gc.bytes_young();
    for i in 0..5 {
        gc.alloc_string(format!("payload-{}", i), None);
        assert!(gc.bytes_young() > last);
        last = gc.bytes_young();
    }
}

#[test]
fn threshold_crossing_triggers_collection_at_the_allocation_site() {
    let mut gc = small_heap();
    let stack: Vec<Value> = vec![];
    let globals: HashMap<String, Value> = HashMap::new();

    // Keep allocating garbage through rooted entry points; the
    // collector must keep the live set bounded on its own.
    for i in 0..100 {
        gc.alloc_string(
            format!("transient-{}", i),
            Some(Roots {
                stack: &stack,
                globals: &globals,
            }),
        );
    }

    assert!(gc.object_count() < 10);
    assert!(gc.bytes_young() < 1024);
}

#[test]
fn soak_loop_keeps_live_bytes_bounded() {
    let mut gc = small_heap();
    let mut stack: Vec<Value> = vec![];
    let globals: HashMap<String, Value> = HashMap::new();

    // One string stays live at a time while hundreds churn through.
    // The total footprint must stay bounded by the thresholds, not by
    // the iteration count.
    for i in 0..500 {
        let id = gc.alloc_string(
            format!("transient-{}", i),
            Some(Roots {
                stack: &stack,
                globals: &globals,
            }),
        );

        stack.clear();
        stack.push(Value::Obj(id));
    }

    assert!(gc.bytes_young() + gc.bytes_old() < 2048);
}
