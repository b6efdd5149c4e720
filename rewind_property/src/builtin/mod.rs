// Copyright 2025 the Rewind Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Behaviors shipped with the crate.
//!
//! - [`Initialize`]: materialises a property's value at construction and
//!   whenever it is read back at its default.
//! - [`Log`]: traces property access, filtered by [`LogEvents`].

mod initialize;
mod log;

pub use initialize::Initialize;
pub use log::{Log, LogConfig, LogEvents};
