// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `Log` output as seen by a subscriber.

use std::fmt;
use std::sync::{Arc, Mutex};

use rewind_property::builtin::{Log, LogConfig, LogEvents};
use rewind_property::{Model, PropertyMetadataBuilder, Registry, Scope, TypeMetadata};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Collects the message of every event it sees.
#[derive(Clone, Default)]
struct Messages(Arc<Mutex<Vec<String>>>);

impl Messages {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Messages {
    fn on_event(&self, event: &Event<'_>, _cx: Context<'_, S>) {
        let mut message = Message(String::new());
        event.record(&mut message);
        self.0.lock().unwrap().push(message.0);
    }
}

#[test]
fn log_follows_its_configured_events() {
    let messages = Messages::default();
    let _subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("rewind_property::builtin=debug"))
        .with(messages.clone())
        .set_default();

    let mut registry = Registry::new();
    let doc = registry.register_type("Doc", TypeMetadata::default());
    let title = registry.register_property(
        doc,
        "Title",
        PropertyMetadataBuilder::new(String::new())
            .behavior(Log::new(LogEvents::WRITES))
            .build(),
    );
    let mut model = Model::new(registry);
    let d = model.create(doc).unwrap();
    messages.take();

    // The read a write performs first is not traced.
    model.set(d, title, "draft".to_string()).unwrap();
    assert_eq!(messages.take(), ["before write", "after write"]);

    model.get(d, title).unwrap();
    assert!(messages.take().is_empty());

    if let Some(config) = model.capability_mut::<LogConfig>(d, Scope::Property(title.id())) {
        config.events = LogEvents::READS;
    }
    model.get(d, title).unwrap();
    assert_eq!(messages.take(), ["before read", "after read"]);
}
