// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Handle Model
//!
//! An [`ObjectId`] is the only thing a caller ever holds for a task or a
//! queue. It packs the registry slot index with the slot's generation at the
//! time the handle was issued:
//!
//! ```text
//!  31            16 15             0
//! +----------------+----------------+
//! |   generation   |   slot index   |
//! +----------------+----------------+
//! ```
//!
//! Freeing a slot bumps its generation, so a handle kept past delete no
//! longer matches once the slot is reused. The first occupant of slot *i*
//! gets generation 0, making its handle value equal to *i*.

use core::fmt;

use crate::config::MAX_API_NAME;

/// Bounded object name
pub type ObjectName = heapless::String<MAX_API_NAME>;

/// ============================================================================
/// Object ID
/// ============================================================================

/// Opaque handle to a registered task or queue
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Sentinel returned when no object matches (all ones)
    pub const UNDEFINED: Self = Self(u32::MAX);

    const INDEX_MASK: u32 = 0xFFFF;
    const GENERATION_SHIFT: u32 = 16;

    /// Create from a slot index and generation
    pub const fn new(index: u16, generation: u16) -> Self {
        Self(((generation as u32) << Self::GENERATION_SHIFT) | index as u32)
    }

    /// Create from raw value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get raw value
    pub const fn into_raw(self) -> u32 {
        self.0
    }

    /// Get the slot index
    pub const fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    /// Get the generation tag
    pub const fn generation(self) -> u16 {
        (self.0 >> Self::GENERATION_SHIFT) as u16
    }

    /// Check if this is the undefined sentinel
    pub const fn is_undefined(self) -> bool {
        self.0 == u32::MAX
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            f.write_str("<undefined>")
        } else {
            write!(f, "{}#{}", self.index(), self.generation())
        }
    }
}

/// Copy a name into a bounded buffer
///
/// Returns `None` if it does not fit below [`MAX_API_NAME`].
pub fn bounded_name(name: &str) -> Option<ObjectName> {
    if name.len() >= MAX_API_NAME {
        return None;
    }
    let mut out = ObjectName::new();
    out.push_str(name).ok()?;
    Some(out)
}

// ============================================================================
// Tests
// ============================================================================
