// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Task management
//!
//! # Modules
//!
//! - [`task`] - Task registry
//! - [`priority`] - OSAL to native priority mapping

pub mod priority;
pub mod task;

// Re-exports
pub use priority::{remap_priority, validate_priority};
pub use task::{DeleteHook, TaskFlags, TaskProperties, TaskRecord, TaskRegistry};
