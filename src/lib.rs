// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # OSAL - Operating System Abstraction Layer
//!
//! A portable, handle-based layer over a real-time kernel. Application code
//! creates tasks and message queues by name and afterwards refers to them
//! only through opaque [`ObjectId`] handles; the native kernel objects stay
//! private to fixed-capacity registries.
//!
//! - **No heap**: task and queue tables are bounded arrays sized in [`config`]
//! - **Interrupt safe**: table mutation runs under a scoped critical section
//! - **Dual context**: queue operations pick ISR-safe kernel primitives when
//!   called from an interrupt handler
//! - **Stale-handle detection**: handles carry a per-slot generation
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── traits.rs          # Kernel trait (native primitives consumed)
//! ├── sync/              # Critical-section guard and guarded cell
//! ├── object/            # Handles, slot table, queue registry
//! ├── sched/             # Task registry and priority remapping
//! ├── interrupt/         # Task vs. interrupt context dispatch
//! ├── arch/              # Bare-metal critical-section backends
//! ├── testing/           # Simulation kernel (std / tests)
//! └── lib.rs             # This file
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use osal::{Osal, Timeout, TaskFlags, PutFlags};
//!
//! let osal = Osal::new(kernel);
//! let q = osal.queues().create("SENSOR", 8, 4, 0)?;
//! osal.queues().put(q, &42u32.to_le_bytes(), PutFlags::empty())?;
//!
//! let mut buf = [0u8; 4];
//! let copied = osal.queues().get(q, &mut buf, Timeout::Check)?;
//! ```

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

// Compile-time limits
pub mod config;

// Status codes
pub mod error;

// Kernel collaborator trait
pub mod traits;

// Tick conversion and timeouts
pub mod time;

// Critical-section guard
pub mod sync;

// Handles, slot table, queue registry
pub mod object;

// Task registry
pub mod sched;

// Execution-context dispatch
pub mod interrupt;

// Architecture-specific critical-section backends
pub mod arch;

// Combined registries
pub mod osal;

// Simulation kernel
#[cfg(any(test, feature = "std"))]
pub mod testing;

// Re-export commonly used types
pub use error::{OsalError, OsalResult, SUCCESS, status_code};

pub use traits::{Kernel, IsrOutcome, QueuePosition, StackWord, TaskEntry, TaskParams, Ticks, WAIT_FOREVER};

pub use time::{millis_to_ticks, millis_to_ticks_ceil, Timeout};

pub use sync::{CriticalSection, CsCell, CsGuard};

pub use object::{
    ObjectId, ObjectName, PutFlags, QueueProperties, QueueRegistry, Slot, SlotTable,
};

pub use sched::{TaskFlags, TaskProperties, TaskRegistry, remap_priority};

pub use interrupt::ExecutionContext;

pub use osal::Osal;

// Integration tests (only compiled in test mode)
#[cfg(test)]
mod tests;
