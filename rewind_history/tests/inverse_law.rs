// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Undo/redo over random edit sequences.

use proptest::collection::vec;
use proptest::prelude::*;
use rewind_history::{DirtyTracking, Dirtyable, UndoRedo, Undoable};
use rewind_property::builtin::Initialize;
use rewind_property::{
    EntityId, Model, Property, PropertyId, PropertyMetadataBuilder, Registry, Snapshot,
    TypeMetadataBuilder, Value,
};

#[derive(Clone, Debug)]
enum Edit {
    Count(i64),
    Title(String),
    Push(i64),
    Pop,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (-3_i64..3).prop_map(Edit::Count),
        "[ab]{0,2}".prop_map(Edit::Title),
        (0_i64..3).prop_map(Edit::Push),
        Just(Edit::Pop),
    ]
}

struct Doc {
    model: Model,
    count: Property<i64>,
    title: Property<String>,
    items: PropertyId,
    root: EntityId,
}

fn doc() -> Doc {
    let mut registry = Registry::new();
    let ty = registry.register_type(
        "Doc",
        TypeMetadataBuilder::new()
            .behavior(Dirtyable)
            .behavior(Undoable::new())
            .build(),
    );
    let count = registry.register_property(ty, "Count", PropertyMetadataBuilder::new(0_i64).build());
    let title = registry.register_property(ty, "Title", PropertyMetadataBuilder::new(String::new()).build());
    let items = registry.register_property(
        ty,
        "Items",
        PropertyMetadataBuilder::new(Value::Null)
            .behavior(Initialize::observable_list())
            .build(),
    );
    let mut model = Model::new(registry);
    let root = model.create(ty).unwrap();
    Doc {
        model,
        count,
        title,
        items: items.id(),
        root,
    }
}

impl Doc {
    fn apply_edit(&mut self, edit: &Edit) {
        let root = self.root;
        let m = &mut self.model;
        match edit {
            Edit::Count(n) => {
                m.set(root, self.count, *n).unwrap();
            }
            Edit::Title(s) => {
                m.set(root, self.title, s.clone()).unwrap();
            }
            Edit::Push(n) => {
                let list = m.read(root, self.items).unwrap().as_list().unwrap();
                m.list_push(list, Value::Int(*n)).unwrap();
            }
            Edit::Pop => {
                let list = m.read(root, self.items).unwrap().as_list().unwrap();
                let len = m.list_len(list).unwrap();
                if len > 0 {
                    m.list_remove(list, len - 1).unwrap();
                }
            }
        }
    }

    fn state(&self) -> Snapshot {
        self.model.export(self.root).unwrap()
    }
}

proptest! {
    #[test]
    fn undo_all_then_redo_all(edits in vec(edit(), 0..16)) {
        let mut d = doc();
        let start = d.state();
        for edit in &edits {
            d.apply_edit(edit);
        }
        let end = d.state();

        let depth = d.model.undo_depth(d.root);
        for _ in 0..depth {
            prop_assert!(d.model.undo(d.root).unwrap());
        }
        prop_assert!(!d.model.can_undo(d.root));
        prop_assert_eq!(d.state(), start);
        prop_assert!(!d.model.is_dirty(d.root));

        for _ in 0..depth {
            prop_assert!(d.model.redo(d.root).unwrap());
        }
        prop_assert!(!d.model.can_redo(d.root));
        prop_assert_eq!(d.state(), end);
    }

    #[test]
    fn each_undo_steps_back_once(edits in vec(edit(), 1..10)) {
        let mut d = doc();
        let mut states = vec![d.state()];
        for edit in &edits {
            d.apply_edit(edit);
            let now = d.state();
            if states.last() != Some(&now) {
                states.push(now);
            }
        }
        prop_assert_eq!(d.model.undo_depth(d.root), states.len() - 1);

        states.pop();
        while let Some(expected) = states.pop() {
            d.model.undo(d.root).unwrap();
            prop_assert_eq!(d.state(), expected);
        }
    }
}
