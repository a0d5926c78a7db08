use std::alloc::System;

use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};

use silvasim::{CollectedData, Overlay, Record, SimulationPayload, Value};

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

const ATTRIBUTES: usize = 10_000;

fn wide_stand() -> Record {
    let mut record = Record::new();
    for i in 0..ATTRIBUTES {
        record.set(format!("attribute_{i}"), Value::Float(i as f64));
    }
    record
}

#[test]
fn branching_does_not_copy_the_wrapped_record() {
    let payload = SimulationPayload::new(Overlay::new(wide_stand()), CollectedData::new(2025));

    // Warm up one branch before measuring.
    let _warm = payload.branch();

    let region = Region::new(GLOBAL);
    let branch = payload.branch();
    let stats = region.change();

    // Budgets are intentionally conservative to avoid CI flakiness.
    // Deep-copying the record would take tens of thousands of allocations;
    // a branch only creates a fresh layer and clones empty containers.
    assert!(
        stats.allocations <= 100,
        "branching allocated too much: {stats:?}"
    );

    drop(branch);
}

#[test]
fn layered_reads_do_not_allocate_per_layer_chain() {
    let mut overlay = Overlay::new(wide_stand());
    for depth in 0..50 {
        overlay = overlay.new_layer();
        overlay.set("attribute_0", Value::Float(depth as f64));
    }

    let region = Region::new(GLOBAL);
    let value = overlay.get("attribute_0").unwrap();
    let deep = overlay.get("attribute_9999").unwrap();
    let stats = region.change();

    assert_eq!(value, Value::Float(49.0));
    assert_eq!(deep, Value::Float(9999.0));
    // A read walks the chain and clones one value; it must not copy maps.
    assert!(
        stats.allocations <= 16,
        "layered read allocated too much: {stats:?}"
    );
}

#[test]
fn fixate_of_deep_chain_applies_every_write_once() {
    let mut overlay = Overlay::new(wide_stand());
    for depth in 0..100 {
        let mut layer = overlay.new_layer();
        layer.set(format!("attribute_{depth}"), Value::Float(-1.0));
        overlay = layer;
    }

    let fixed = overlay.fixate();
    for depth in 0..100 {
        assert_eq!(
            fixed.get(&format!("attribute_{depth}")),
            Some(&Value::Float(-1.0)),
            "override lost at depth {depth}"
        );
    }
    assert_eq!(
        fixed.get("attribute_5000"),
        Some(&Value::Float(5000.0)),
        "untouched attribute changed"
    );
}
