// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Status codes
//!
//! Every registry operation returns an [`OsalResult`]. The error variants
//! keep the classic OSAL integer codes so callers that speak the C status
//! convention can flatten a result with [`status_code`].

use core::fmt;

/// Status code for a successful call
pub const SUCCESS: i32 = 0;

/// OSAL error codes
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsalError {
    /// A native kernel primitive failed
    OsError = -1,

    /// A required argument was absent or empty
    InvalidPointer = -2,

    /// No item was available before the timeout expired
    QueueEmpty = -8,

    /// No space was available in the queue
    QueueFull = -9,

    /// Buffer or item size does not match the queue
    QueueInvalidSize = -11,

    /// Queue handle is out of range, free, or stale
    QueueIdError = -12,

    /// Name does not fit the name buffer
    NameTooLong = -13,

    /// Registry table is full
    NoFreeIds = -14,

    /// Another live object already uses this name
    NameTaken = -15,

    /// Task handle is out of range, free, or stale
    InvalidId = -16,

    /// No object is registered under this name
    NameNotFound = -17,

    /// Requested priority is outside the OSAL range
    InvalidPriority = -19,
}

/// Result type used throughout the crate
pub type OsalResult<T> = Result<T, OsalError>;

impl OsalError {
    /// Get the integer status code
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Create from an integer status code
    ///
    /// Returns `None` for [`SUCCESS`] and for unknown codes.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::OsError),
            -2 => Some(Self::InvalidPointer),
            -8 => Some(Self::QueueEmpty),
            -9 => Some(Self::QueueFull),
            -11 => Some(Self::QueueInvalidSize),
            -12 => Some(Self::QueueIdError),
            -13 => Some(Self::NameTooLong),
            -14 => Some(Self::NoFreeIds),
            -15 => Some(Self::NameTaken),
            -16 => Some(Self::InvalidId),
            -17 => Some(Self::NameNotFound),
            -19 => Some(Self::InvalidPriority),
            _ => None,
        }
    }

    /// Get the OSAL constant name
    pub const fn name(self) -> &'static str {
        match self {
            Self::OsError => "OS_ERROR",
            Self::InvalidPointer => "OS_INVALID_POINTER",
            Self::QueueEmpty => "OS_QUEUE_EMPTY",
            Self::QueueFull => "OS_QUEUE_FULL",
            Self::QueueInvalidSize => "OS_QUEUE_INVALID_SIZE",
            Self::QueueIdError => "OS_QUEUE_ID_ERROR",
            Self::NameTooLong => "OS_ERR_NAME_TOO_LONG",
            Self::NoFreeIds => "OS_ERR_NO_FREE_IDS",
            Self::NameTaken => "OS_ERR_NAME_TAKEN",
            Self::InvalidId => "OS_ERR_INVALID_ID",
            Self::NameNotFound => "OS_ERR_NAME_NOT_FOUND",
            Self::InvalidPriority => "OS_ERR_INVALID_PRIORITY",
        }
    }
}

impl fmt::Display for OsalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Flatten a result into its integer status code
pub fn status_code<T>(result: &OsalResult<T>) -> i32 {
    match result {
        Ok(_) => SUCCESS,
        Err(e) => e.code(),
    }
}

// ============================================================================
// Tests
// ============================================================================
