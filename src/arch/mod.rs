// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture-specific critical-section backends
//!
//! Exactly one `critical_section::Impl` may be registered per binary.
//! Hosted builds take it from `critical-section`'s `std` feature; bare-metal
//! builds enable the backend for their architecture.

#[cfg(all(feature = "amd64", target_arch = "x86_64"))]
pub mod amd64;
