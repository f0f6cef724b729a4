// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Slot Table
//!
//! The fixed-capacity arena behind both registries. Each slot moves through
//!
//! ```text
//! Free -> Reserved -> Populated -> Reserved (retiring) -> Free
//!           |                                              ^
//!           +--------------- release (rollback) -----------+
//! ```
//!
//! A reserved slot already owns its name, so uniqueness holds while the
//! native object is being created, but it is invisible to handle and name
//! lookups. Every return to `Free` bumps the slot generation.
//!
//! The table itself does no locking; registries keep it inside a
//! [`CsCell`](crate::sync::CsCell) and call these methods under the guard.

use crate::error::OsalError;
use crate::object::handle::{bounded_name, ObjectId, ObjectName};

/// Slot occupancy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState<R> {
    /// Available for reservation
    Free,
    /// Claimed, but not (or no longer) usable through a handle
    Reserved,
    /// Live object
    Populated(R),
}

/// One registry slot
#[derive(Debug)]
pub struct Slot<R> {
    generation: u16,
    name: ObjectName,
    state: SlotState<R>,
}

impl<R> Slot<R> {
    /// Empty slot
    pub const FREE: Self = Self {
        generation: 0,
        name: ObjectName::new(),
        state: SlotState::Free,
    };

    /// Check if the slot is free
    pub fn is_free(&self) -> bool {
        matches!(self.state, SlotState::Free)
    }

    /// Get the populated record, if any
    pub fn record(&self) -> Option<&R> {
        match &self.state {
            SlotState::Populated(r) => Some(r),
            _ => None,
        }
    }

    /// Get the slot name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Get the current generation
    pub fn generation(&self) -> u16 {
        self.generation
    }

    fn clear(&mut self) {
        self.state = SlotState::Free;
        self.name.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Fixed-capacity slot table
pub struct SlotTable<R, const N: usize> {
    slots: [Slot<R>; N],
}

impl<R, const N: usize> SlotTable<R, N> {
    /// Create a table with every slot free
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::<R>::FREE }; N],
        }
    }

    /// Reserve the first free slot for `name`
    ///
    /// # Returns
    ///
    /// - Ok(index) of the reserved slot
    /// - Err(NameTooLong) if the name does not fit
    /// - Err(NoFreeIds) if every slot is in use
    /// - Err(NameTaken) if a reserved or live slot already uses the name
    pub fn reserve(&mut self, name: &str) -> Result<usize, OsalError> {
        let stored = bounded_name(name).ok_or(OsalError::NameTooLong)?;

        let index = self
            .slots
            .iter()
            .position(Slot::is_free)
            .ok_or(OsalError::NoFreeIds)?;

        if self.name_in_use(name) {
            return Err(OsalError::NameTaken);
        }

        let slot = &mut self.slots[index];
        slot.name = stored;
        slot.state = SlotState::Reserved;
        Ok(index)
    }

    /// Populate a reserved slot and issue its handle
    ///
    /// Returns `None` if the slot is not reserved.
    pub fn populate(&mut self, index: usize, record: R) -> Option<ObjectId> {
        let slot = self.slots.get_mut(index)?;
        if !matches!(slot.state, SlotState::Reserved) {
            return None;
        }
        slot.state = SlotState::Populated(record);
        Some(ObjectId::new(index as u16, slot.generation))
    }

    /// Return a reserved slot to the free pool
    ///
    /// Used both to roll back a failed creation and to finish a retirement.
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if matches!(slot.state, SlotState::Reserved) {
                slot.clear();
            }
        }
    }

    /// Take the record out of a live slot, leaving it reserved
    ///
    /// The name stays claimed until [`release`](Self::release), and the
    /// handle stops resolving immediately.
    pub fn retire(&mut self, id: ObjectId) -> Option<R> {
        self.get(id)?;
        let slot = &mut self.slots[id.index()];
        match core::mem::replace(&mut slot.state, SlotState::Reserved) {
            SlotState::Populated(record) => Some(record),
            _ => None,
        }
    }

    /// Free a live slot in one step
    pub fn remove(&mut self, id: ObjectId) -> Option<R> {
        let record = self.retire(id)?;
        self.slots[id.index()].clear();
        Some(record)
    }

    /// Look up a live record by handle
    pub fn get(&self, id: ObjectId) -> Option<&R> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.record()
    }

    /// Look up a live record by handle (mutable)
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut R> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        match &mut slot.state {
            SlotState::Populated(r) => Some(r),
            _ => None,
        }
    }

    /// Get the name of a live slot
    pub fn name_of(&self, id: ObjectId) -> Option<&str> {
        self.get(id)?;
        Some(self.slots[id.index()].name())
    }

    /// Find the first live slot whose record matches
    pub fn find<F>(&self, mut pred: F) -> Option<ObjectId>
    where
        F: FnMut(&R) -> bool,
    {
        self.iter().find(|&(_, r)| pred(r)).map(|(id, _)| id)
    }

    /// Find a live slot by exact name
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, slot)| slot.record().is_some() && slot.name() == name)
            .map(|(i, slot)| ObjectId::new(i as u16, slot.generation))
    }

    /// Iterate over live slots
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &R)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.record()
                .map(|r| (ObjectId::new(i as u16, slot.generation), r))
        })
    }

    /// Count free slots
    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_free()).count()
    }

    fn name_in_use(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|slot| !slot.is_free() && slot.name() == name)
    }
}

impl<R, const N: usize> Default for SlotTable<R, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
