// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Randomised export/apply round trips.

use proptest::collection::vec;
use proptest::prelude::*;
use rewind_property::builtin::Initialize;
use rewind_property::{
    EntityId, EntityTypeId, Model, Property, PropertyId, PropertyMetadataBuilder, Registry,
    TypeMetadata, Value,
};

#[derive(Clone, Debug)]
enum Op {
    Count(i64),
    Name(String),
    Push(i64),
    Remove(usize),
    Label(String),
    DropChild,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Count),
        "[a-z]{0,4}".prop_map(Op::Name),
        (0_i64..5).prop_map(Op::Push),
        (0_usize..8).prop_map(Op::Remove),
        "[a-z]{0,4}".prop_map(Op::Label),
        Just(Op::DropChild),
    ]
}

struct Doc {
    model: Model,
    leaf: EntityTypeId,
    count: Property<i64>,
    name: Property<String>,
    items: PropertyId,
    child: Property<Option<EntityId>>,
    label: Property<String>,
    root: EntityId,
}

fn doc() -> Doc {
    let mut registry = Registry::new();
    let leaf = registry.register_type("Leaf", TypeMetadata::default());
    let label = registry.register_property(leaf, "Label", PropertyMetadataBuilder::new(String::new()).build());
    let node = registry.register_type("Root", TypeMetadata::default());
    let count = registry.register_property(node, "Count", PropertyMetadataBuilder::new(0_i64).build());
    let name = registry.register_property(node, "Name", PropertyMetadataBuilder::new(String::new()).build());
    let items = registry.register_property(
        node,
        "Items",
        PropertyMetadataBuilder::new(Value::Null)
            .behavior(Initialize::observable_list())
            .build(),
    );
    let child = registry.register_property(node, "Child", PropertyMetadataBuilder::new(None).build());
    let mut model = Model::new(registry);
    let root = model.create(node).unwrap();
    Doc {
        model,
        leaf,
        count,
        name,
        items: items.id(),
        child,
        label,
        root,
    }
}

impl Doc {
    fn run(&mut self, op: &Op) {
        let m = &mut self.model;
        let root = self.root;
        match op {
            Op::Count(n) => {
                m.set(root, self.count, *n).unwrap();
            }
            Op::Name(s) => {
                m.set(root, self.name, s.clone()).unwrap();
            }
            Op::Push(n) => {
                let list = m.read(root, self.items).unwrap().as_list().unwrap();
                m.list_push(list, Value::Int(*n)).unwrap();
            }
            Op::Remove(i) => {
                let list = m.read(root, self.items).unwrap().as_list().unwrap();
                let len = m.list_len(list).unwrap();
                if len > 0 {
                    m.list_remove(list, i % len).unwrap();
                }
            }
            Op::Label(s) => {
                let child = match m.get(root, self.child).unwrap() {
                    Some(child) => child,
                    None => {
                        let child = m.create(self.leaf).unwrap();
                        m.set(root, self.child, Some(child)).unwrap();
                        child
                    }
                };
                m.set(child, self.label, s.clone()).unwrap();
            }
            Op::DropChild => {
                m.set(root, self.child, None).unwrap();
            }
        }
    }
}

proptest! {
    #[test]
    fn apply_of_export_is_identity(ops in vec(op(), 0..24)) {
        let mut d = doc();
        for op in &ops {
            d.run(op);
        }
        let snap = d.model.export(d.root).unwrap();
        d.model.apply(&snap, d.root).unwrap();
        prop_assert!(d.model.matches(&snap, d.root).unwrap());
    }

    #[test]
    fn apply_restores_an_earlier_state(
        before in vec(op(), 0..12),
        after in vec(op(), 1..12),
    ) {
        let mut d = doc();
        for op in &before {
            d.run(op);
        }
        let snap = d.model.export(d.root).unwrap();
        for op in &after {
            d.run(op);
        }
        d.model.apply(&snap, d.root).unwrap();
        prop_assert_eq!(d.model.export(d.root).unwrap(), snap);
        if let Some(child) = d.model.get(d.root, d.child).unwrap() {
            prop_assert_eq!(d.model.parents(child).collect::<Vec<_>>(), vec![d.root]);
        }
    }
}
