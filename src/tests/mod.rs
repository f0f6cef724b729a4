// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Integration Tests
//!
//! Exercise both registries together through the [`Osal`](crate::Osal)
//! facade on top of the simulation kernel.
