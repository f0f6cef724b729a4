// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Registered Objects
//!
//! Callers never see native kernel identifiers. Every task and queue is
//! reached through an [`ObjectId`] issued by a fixed-capacity slot table.
//!
//! # Modules
//!
//! - [`handle`] - Generation-tagged handles and bounded names
//! - [`table`] - Slot table shared by both registries
//! - [`queue`] - Queue registry

pub mod handle;
pub mod table;
pub mod queue;

// Re-exports
pub use handle::{bounded_name, ObjectId, ObjectName};
pub use table::{Slot, SlotState, SlotTable};
pub use queue::{PutFlags, QueueProperties, QueueRecord, QueueRegistry};
