// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for the property pipeline, snapshots, and history.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use rewind_history::{DirtyTracking, Dirtyable, UndoRedo, Undoable};
use rewind_property::builtin::Initialize;
use rewind_property::{
    EntityId, EntityTypeId, Model, Property, PropertyId, PropertyMetadataBuilder, Registry,
    TypeMetadataBuilder, Value,
};

#[derive(Clone, Copy)]
struct Schema {
    node: EntityTypeId,
    value: Property<i64>,
    child: Property<Option<EntityId>>,
    items: PropertyId,
}

fn model(tracked: bool) -> (Model, Schema) {
    let mut registry = Registry::new();
    let mut ty = TypeMetadataBuilder::new();
    if tracked {
        ty = ty.behavior(Dirtyable).behavior(Undoable::with_capacity(64));
    }
    let node = registry.register_type("Node", ty.build());
    let value = registry.register_property(node, "Value", PropertyMetadataBuilder::new(0_i64).build());
    let child = registry.register_property(node, "Child", PropertyMetadataBuilder::new(None).build());
    let items = registry.register_property(
        node,
        "Items",
        PropertyMetadataBuilder::new(Value::Null)
            .behavior(Initialize::observable_list())
            .build(),
    );
    (
        Model::new(registry),
        Schema {
            node,
            value,
            child,
            items: items.id(),
        },
    )
}

/// A chain of `depth` nodes, each holding `width` integers in its list.
fn chain(model: &mut Model, s: Schema, depth: usize, width: i64) -> (EntityId, EntityId) {
    let root = model.create(s.node).unwrap();
    let mut tail = root;
    for _ in 1..depth {
        let next = model.create(s.node).unwrap();
        model.set(tail, s.child, Some(next)).unwrap();
        tail = next;
    }
    let mut cursor = Some(root);
    while let Some(e) = cursor {
        let list = model.read(e, s.items).unwrap().as_list().unwrap();
        for i in 0..width {
            model.list_push(list, Value::Int(i)).unwrap();
        }
        cursor = model.get(e, s.child).unwrap();
    }
    (root, tail)
}

fn bench_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("rewind_property");
    group.sample_size(50);

    for tracked in [false, true] {
        let (mut m, s) = model(tracked);
        let e = m.create(s.node).unwrap();
        let mut i = 0_i64;
        group.bench_with_input(BenchmarkId::new("write", tracked), &tracked, |b, _| {
            b.iter(|| {
                i = (i + 1) % 1_024;
                black_box(m.set(e, s.value, i).unwrap());
            });
        });
    }

    for &(depth, width) in &[(4_usize, 8_i64), (16, 8), (16, 64)] {
        let (mut m, s) = model(false);
        let (root, _) = chain(&mut m, s, depth, width);
        let label = format!("d={depth},w={width}");

        group.bench_with_input(BenchmarkId::new("export", &label), &root, |b, &root| {
            b.iter(|| black_box(m.export(root).unwrap()));
        });

        let snap = m.export(root).unwrap();
        group.bench_with_input(BenchmarkId::new("apply_in_place", &label), &root, |b, &root| {
            b.iter(|| m.apply(black_box(&snap), root).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("apply_new", &label), &snap, |b, snap| {
            b.iter_batched(
                || model(false).0,
                |mut fresh| black_box(fresh.apply_new(snap).unwrap()),
                BatchSize::SmallInput,
            );
        });
    }

    for &depth in &[4_usize, 32] {
        group.bench_with_input(BenchmarkId::new("leaf_edit_undo", depth), &depth, |b, &depth| {
            b.iter_batched(
                || {
                    let (mut m, s) = model(true);
                    let (root, leaf) = chain(&mut m, s, depth, 4);
                    m.clean(root).unwrap();
                    (m, s, root, leaf)
                },
                |(mut m, s, root, leaf)| {
                    m.set(leaf, s.value, 1).unwrap();
                    m.undo(root).unwrap();
                    black_box(m.is_dirty(root));
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_model);
criterion_main!(benches);
