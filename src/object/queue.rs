// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Queue Registry
//!
//! Maps queue handles to native kernel queues. Each queue carries fixed-size
//! items; depth and item size are set at creation and never change.
//!
//! Transfers are routed through [`ExecutionContext`], so `get` and `put`
//! may be called from both tasks and interrupt handlers. Producers never
//! block: `put` on a full queue reports [`OsalError::QueueFull`] at once.

use bitflags::bitflags;
use log::{debug, info, warn};

use crate::config::{MAX_QUEUES, MAX_QUEUE_DEPTH};
use crate::error::{OsalError, OsalResult};
use crate::interrupt::ExecutionContext;
use crate::object::handle::{bounded_name, ObjectId, ObjectName};
use crate::object::table::SlotTable;
use crate::sync::CsCell;
use crate::time::Timeout;
use crate::traits::{Kernel, QueuePosition};

bitflags! {
    /// Flags accepted by [`QueueRegistry::put`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PutFlags: u32 {
        /// Enqueue ahead of everything already waiting
        const URGENT = 0x01;
    }
}

impl PutFlags {
    fn position(self) -> QueuePosition {
        if self.contains(Self::URGENT) {
            QueuePosition::Front
        } else {
            QueuePosition::Back
        }
    }
}

/// Per-queue bookkeeping
#[derive(Debug, Clone, Copy)]
pub struct QueueRecord<Q> {
    native: Q,
    depth: u32,
    item_size: u32,
}

/// Snapshot of a queue's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueProperties {
    /// Queue name
    pub name: ObjectName,
    /// Maximum number of items
    pub depth: u32,
    /// Size of every item in bytes
    pub item_size: u32,
}

/// Queue registry
pub struct QueueRegistry<K: Kernel> {
    kernel: K,
    table: CsCell<SlotTable<QueueRecord<K::QueueId>, MAX_QUEUES>>,
}

impl<K: Kernel> QueueRegistry<K> {
    /// Create an empty registry over `kernel`
    pub const fn new(kernel: K) -> Self {
        Self {
            kernel,
            table: CsCell::new(SlotTable::new()),
        }
    }

    /// Create a named queue
    ///
    /// `flags` is reserved; no creation flags are defined yet.
    ///
    /// # Returns
    ///
    /// - Ok(handle) of the new queue
    /// - Err(InvalidPointer) for an empty name, zero depth or zero item size
    /// - Err(NameTooLong) / Err(NameTaken) / Err(NoFreeIds) from reservation
    /// - Err(QueueInvalidSize) if `depth` exceeds [`MAX_QUEUE_DEPTH`]
    /// - Err(OsError) if the kernel could not create the queue
    pub fn create(
        &self,
        name: &str,
        depth: u32,
        item_size: u32,
        flags: u32,
    ) -> OsalResult<ObjectId> {
        if name.is_empty() || depth == 0 || item_size == 0 {
            return Err(OsalError::InvalidPointer);
        }
        if bounded_name(name).is_none() {
            return Err(OsalError::NameTooLong);
        }
        if depth > MAX_QUEUE_DEPTH {
            return Err(OsalError::QueueInvalidSize);
        }

        let index = self.table.lock().reserve(name)?;
        debug!("queue: reserved slot {} for {:?} (flags {:#x})", index, name, flags);

        let Some(native) = self.kernel.queue_create(depth, item_size) else {
            self.table.lock().release(index);
            warn!("queue: kernel create failed for {:?}, slot {} released", name, index);
            return Err(OsalError::OsError);
        };

        let record = QueueRecord {
            native,
            depth,
            item_size,
        };
        let Some(id) = self.table.lock().populate(index, record) else {
            // Slot was not ours any more; do not leak the native queue
            self.kernel.queue_delete(native);
            return Err(OsalError::OsError);
        };

        info!("queue: created {:?} as {} ({} x {} bytes)", name, id, depth, item_size);
        Ok(id)
    }

    /// Delete a queue
    ///
    /// Items still queued are discarded.
    pub fn delete(&self, id: ObjectId) -> OsalResult<()> {
        let record = self.table.lock().retire(id).ok_or(OsalError::QueueIdError)?;

        self.kernel.queue_delete(record.native);
        self.table.lock().release(id.index());

        info!("queue: deleted {}", id);
        Ok(())
    }

    /// Receive one item into `buf`
    ///
    /// In interrupt context the receive never blocks and `timeout` is
    /// ignored.
    ///
    /// # Returns
    ///
    /// - Ok(size) of the copied item (always the queue's item size)
    /// - Err(QueueIdError) for a bad handle or empty buffer
    /// - Err(QueueInvalidSize) if `buf` is shorter than one item
    /// - Err(QueueEmpty) if nothing arrived in time
    pub fn get(&self, id: ObjectId, buf: &mut [u8], timeout: Timeout) -> OsalResult<usize> {
        let record = self.lookup(id)?;
        if buf.is_empty() {
            return Err(OsalError::QueueIdError);
        }
        let item_size = record.item_size as usize;
        if buf.len() < item_size {
            return Err(OsalError::QueueInvalidSize);
        }

        let context = ExecutionContext::current(&self.kernel);
        let wait = if context.can_block() {
            timeout.to_ticks(self.kernel.tick_rate_hz())
        } else {
            0
        };
        if context.receive(&self.kernel, record.native, &mut buf[..item_size], wait) {
            Ok(item_size)
        } else {
            Err(OsalError::QueueEmpty)
        }
    }

    /// Send one item
    ///
    /// Never blocks. Items shorter than the queue's item size are
    /// zero-filled.
    pub fn put(&self, id: ObjectId, data: &[u8], flags: PutFlags) -> OsalResult<()> {
        let record = self.lookup(id)?;
        if data.is_empty() {
            return Err(OsalError::QueueIdError);
        }
        if data.len() > record.item_size as usize {
            return Err(OsalError::QueueInvalidSize);
        }

        let context = ExecutionContext::current(&self.kernel);
        if context.send(&self.kernel, record.native, data, flags.position()) {
            Ok(())
        } else {
            Err(OsalError::QueueFull)
        }
    }

    /// Find a queue by name
    pub fn get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        if name.is_empty() {
            return Err(OsalError::QueueIdError);
        }
        if bounded_name(name).is_none() {
            return Err(OsalError::NameTooLong);
        }
        self.table
            .lock()
            .find_by_name(name)
            .ok_or(OsalError::QueueIdError)
    }

    /// Get a queue's configuration
    pub fn get_info(&self, id: ObjectId) -> OsalResult<QueueProperties> {
        let table = self.table.lock();
        let record = table.get(id).ok_or(OsalError::QueueIdError)?;
        let name = bounded_name(table.name_of(id).unwrap_or_default()).unwrap_or_default();
        Ok(QueueProperties {
            name,
            depth: record.depth,
            item_size: record.item_size,
        })
    }

    /// Number of unused queue slots
    pub fn free_slots(&self) -> usize {
        self.table.lock().free_count()
    }

    fn lookup(&self, id: ObjectId) -> OsalResult<QueueRecord<K::QueueId>> {
        self.table.lock().get(id).copied().ok_or(OsalError::QueueIdError)
    }
}

// ============================================================================
// Tests
// ============================================================================
