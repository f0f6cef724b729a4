// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Synchronization Primitives
//!
//! # Primitives
//!
//! - **CriticalSection**: RAII guard masking preemption for short table updates
//! - **CsCell**: Data cell borrowed only through a critical section

pub mod critical;

// Re-exports
pub use critical::{CriticalSection, CsCell, CsGuard};
