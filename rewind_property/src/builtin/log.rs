// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bitflags::bitflags;
use tracing::debug;

use crate::behavior::{Behavior, Interception, WriteDecision};
use crate::capability::Installation;
use crate::error::Result;
use crate::value::Value;

bitflags! {
    /// Which property events [`Log`] traces.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct LogEvents: u8 {
        /// Before the read pipeline computes a value.
        const BEFORE_READ = 1 << 0;
        /// After a read, with the final value.
        const AFTER_READ = 1 << 1;
        /// Before a write, with the proposed and current values.
        const BEFORE_WRITE = 1 << 2;
        /// After a write, with the committed value.
        const AFTER_WRITE = 1 << 3;
        /// Both read events.
        const READS = Self::BEFORE_READ.bits() | Self::AFTER_READ.bits();
        /// Both write events.
        const WRITES = Self::BEFORE_WRITE.bits() | Self::AFTER_WRITE.bits();
    }
}

/// Capability installed by [`Log`]; resolvable and adjustable at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Events currently traced.
    pub events: LogEvents,
}

/// Emits `debug` tracing events for property access.
///
/// Declared on a type it covers every property; declared on a property it
/// covers that one. The filter lives in a [`LogConfig`] capability at the
/// declaration's scope, so it can be changed per entity after construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Log {
    events: LogEvents,
}

impl Default for Log {
    fn default() -> Self {
        Self::new(LogEvents::all())
    }
}

impl Log {
    /// Traces only `events`.
    #[must_use]
    pub const fn new(events: LogEvents) -> Self {
        Self { events }
    }

    /// Events traced by entities constructed with this declaration.
    #[must_use]
    pub const fn events(&self) -> LogEvents {
        self.events
    }
}

fn enabled(cx: &Interception<'_>, event: LogEvents) -> bool {
    cx.capability::<LogConfig>()
        .is_some_and(|config| config.events.contains(event))
}

impl Behavior for Log {
    fn install(&self, installation: &mut Installation<'_>) {
        installation.provide(LogConfig {
            events: self.events,
        });
    }

    fn before_read(&self, cx: &mut Interception<'_>) -> Result<()> {
        if enabled(cx, LogEvents::BEFORE_READ) {
            debug!(entity = ?cx.entity(), property = ?cx.property(), "before read");
        }
        Ok(())
    }

    fn after_read(&self, cx: &mut Interception<'_>, value: Value) -> Result<Value> {
        if enabled(cx, LogEvents::AFTER_READ) {
            debug!(entity = ?cx.entity(), property = ?cx.property(), ?value, "after read");
        }
        Ok(value)
    }

    fn before_write(
        &self,
        cx: &mut Interception<'_>,
        proposed: &mut Value,
        current: &mut Value,
    ) -> Result<WriteDecision> {
        if enabled(cx, LogEvents::BEFORE_WRITE) {
            debug!(
                entity = ?cx.entity(),
                property = ?cx.property(),
                ?proposed,
                ?current,
                "before write"
            );
        }
        Ok(WriteDecision::Accept)
    }

    fn after_write(
        &self,
        cx: &mut Interception<'_>,
        _proposed: &Value,
        current: &mut Value,
        changed: bool,
    ) -> Result<()> {
        if enabled(cx, LogEvents::AFTER_WRITE) {
            debug!(
                entity = ?cx.entity(),
                property = ?cx.property(),
                ?current,
                changed,
                "after write"
            );
        }
        Ok(())
    }
}
