// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Tick conversion and timeouts

use crate::traits::{Ticks, WAIT_FOREVER};

/// Convert milliseconds into native ticks
///
/// Computes `ms * tick_rate_hz / 1000` with truncation. The product is taken
/// in 64 bits; results that would reach [`WAIT_FOREVER`] saturate just below
/// it so a finite delay never turns into an infinite one.
pub fn millis_to_ticks(ms: u32, tick_rate_hz: u32) -> Ticks {
    let ticks = (ms as u64 * tick_rate_hz as u64) / 1000;
    ticks.min(WAIT_FOREVER as u64 - 1) as Ticks
}

/// Convert milliseconds into native ticks, rounding up
///
/// A positive wait never shrinks to zero ticks, so a short timeout still
/// waits instead of degrading to a single poll.
pub fn millis_to_ticks_ceil(ms: u32, tick_rate_hz: u32) -> Ticks {
    let ticks = (ms as u64 * tick_rate_hz as u64).div_ceil(1000);
    let ticks = if ms > 0 { ticks.max(1) } else { 0 };
    ticks.min(WAIT_FOREVER as u64 - 1) as Ticks
}

/// Timeout for a blocking queue receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until an item arrives
    Pend,
    /// Poll once and return immediately
    Check,
    /// Wait up to this many milliseconds
    Millis(u32),
}

impl Timeout {
    /// OSAL encoding of [`Timeout::Pend`]
    pub const PEND_RAW: i32 = -1;

    /// OSAL encoding of [`Timeout::Check`]
    pub const CHECK_RAW: i32 = 0;

    /// Create from the OSAL integer encoding
    ///
    /// Any negative value pends; zero polls; a positive value is milliseconds.
    pub const fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            Self::Pend
        } else if raw == 0 {
            Self::Check
        } else {
            Self::Millis(raw as u32)
        }
    }

    /// Get the OSAL integer encoding
    pub const fn into_raw(self) -> i32 {
        match self {
            Self::Pend => Self::PEND_RAW,
            Self::Check => Self::CHECK_RAW,
            Self::Millis(ms) => {
                if ms > i32::MAX as u32 {
                    i32::MAX
                } else {
                    ms as i32
                }
            }
        }
    }

    /// Convert into a native wait in ticks
    ///
    /// `Millis` rounds up to whole ticks.
    pub fn to_ticks(self, tick_rate_hz: u32) -> Ticks {
        match self {
            Self::Pend => WAIT_FOREVER,
            Self::Check => 0,
            Self::Millis(ms) => millis_to_ticks_ceil(ms, tick_rate_hz),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
