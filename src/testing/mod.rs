// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Testing infrastructure for hosted verification
//!
//! Provides a simulated kernel so the registries and dispatch can be
//! exercised on the host.
//!
//! # Usage
//! ```ignore
//! use osal::testing::SimKernel;
//! use osal::Osal;
//!
//! let osal = Osal::new(SimKernel::new());
//! let q = osal.queues().create("Q1", 4, 4, 0)?;
//! ```

pub mod sim;

pub use sim::{SimKernel, SimQueueId, SimTaskId, TaskExited};
