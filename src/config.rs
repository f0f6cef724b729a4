// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Compile-time configuration
//!
//! Table capacities and naming/priority limits. Capacity never grows at
//! runtime; every registry is a fixed array sized from these constants.

/// Maximum number of tasks registered at once
pub const MAX_TASKS: usize = 64;

/// Maximum number of queues registered at once
pub const MAX_QUEUES: usize = 64;

/// Name buffer size, counting the terminator position
///
/// A name is accepted only if `name.len() < MAX_API_NAME`.
pub const MAX_API_NAME: usize = 20;

/// Highest OSAL priority a caller may request
pub const MAX_PRIORITY: u32 = 255;

/// Maximum depth accepted by queue creation
pub const MAX_QUEUE_DEPTH: u32 = 50;

// Slot indices must fit the 16-bit index field of a handle, leaving
// 0xFFFF free so the all-ones sentinel never decodes to a real slot.
const _: () = assert!(MAX_TASKS < u16::MAX as usize);
const _: () = assert!(MAX_QUEUES < u16::MAX as usize);
const _: () = assert!(MAX_API_NAME > 1);
