// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Priority mapping
//!
//! OSAL priorities run from 0 to [`MAX_PRIORITY`]. Native kernels usually
//! support far fewer levels, so a valid request is clamped into the native
//! range rather than rejected.

use crate::config::MAX_PRIORITY;
use crate::error::{OsalError, OsalResult};

/// Check that a requested priority is within the OSAL range
pub const fn validate_priority(priority: u32) -> OsalResult<u32> {
    if priority > MAX_PRIORITY {
        Err(OsalError::InvalidPriority)
    } else {
        Ok(priority)
    }
}

/// Clamp an OSAL priority into `0..=native_max`
///
/// Numeric direction is passed through unchanged.
#[inline]
pub const fn remap_priority(priority: u32, native_max: u32) -> u32 {
    if priority > native_max {
        native_max
    } else {
        priority
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_priority() {
        assert_eq!(validate_priority(0), Ok(0));
        assert_eq!(validate_priority(MAX_PRIORITY), Ok(MAX_PRIORITY));
        assert_eq!(validate_priority(MAX_PRIORITY + 1), Err(OsalError::InvalidPriority));
    }

    #[test]
    fn test_remap_priority_clamps() {
        assert_eq!(remap_priority(3, 24), 3);
        assert_eq!(remap_priority(24, 24), 24);
        assert_eq!(remap_priority(200, 24), 24);
        assert_eq!(remap_priority(7, 0), 0);
    }
}
