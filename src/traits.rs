// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel collaborator trait
//!
//! This module defines the native primitives the registries consume.
//!
//! Each supported real-time kernel implements [`Kernel`]. The registries
//! never hand the associated `TaskId`/`QueueId` values to application code.

use core::fmt::Debug;

/// Native tick count
pub type Ticks = u32;

/// Tick value meaning "block until the operation can complete"
pub const WAIT_FOREVER: Ticks = Ticks::MAX;

/// Word type of a caller-supplied task stack
pub type StackWord = u32;

/// Task entry point
pub type TaskEntry = fn();

/// Parameters for native task creation
#[derive(Debug, Clone, Copy)]
pub struct TaskParams<'a> {
    /// Task name as registered with the kernel
    pub name: &'a str,
    /// Entry point run by the new task
    pub entry: TaskEntry,
    /// Requested stack size
    pub stack_size: u32,
    /// Native priority (already remapped)
    pub priority: u32,
}

/// Where a queue send places the item
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePosition {
    /// Append behind queued items (FIFO)
    Back = 0,
    /// Place ahead of queued items
    Front = 1,
}

/// Result of an interrupt-safe queue primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IsrOutcome {
    /// The item was transferred
    pub completed: bool,
    /// A task of higher priority than the interrupted one was unblocked
    pub task_woken: bool,
}

/// Trait for real-time kernel operations
///
/// This trait provides a unified interface over different kernels:
/// - FreeRTOS-style kernels: tasks, queues, `FromISR` entry points
/// - Hosted simulation: [`crate::testing::SimKernel`]
///
/// Queue items are raw bytes of a fixed `item_size`. Send buffers may be
/// shorter than that; see [`Kernel::queue_send`].
///
/// Tasks are created suspended and only run after [`Kernel::task_start`],
/// so a new task never observes its own registration half done.
pub trait Kernel {
    /// Native task identifier
    type TaskId: Copy + Eq + Debug;

    /// Native queue identifier
    type QueueId: Copy + Eq + Debug;

    /// Scheduler tick frequency in Hz
    fn tick_rate_hz(&self) -> u32;

    /// Highest valid native priority
    fn max_priority(&self) -> u32;

    /// Check if the caller is executing in interrupt context
    fn in_interrupt(&self) -> bool;

    /// Create a suspended task whose stack the kernel allocates
    ///
    /// The task must not run before [`task_start`](Self::task_start).
    ///
    /// # Returns
    /// * `Some(id)` if the task was created
    /// * `None` if the kernel could not create it
    fn task_create(&self, params: &TaskParams<'_>) -> Option<Self::TaskId>;

    /// Create a suspended task on a caller-supplied stack
    ///
    /// `params.stack_size` equals the buffer size in bytes. Kernels without
    /// static allocation support return `None`.
    fn task_create_static(
        &self,
        params: &TaskParams<'_>,
        stack: &'static mut [StackWord],
    ) -> Option<Self::TaskId>;

    /// Make a task created by `task_create*` runnable
    ///
    /// On a preemptive kernel a task that outranks the caller runs before
    /// this returns.
    fn task_start(&self, task: Self::TaskId);

    /// Delete another task
    fn task_delete(&self, task: Self::TaskId);

    /// Delete the calling task
    fn task_exit(&self) -> !;

    /// Get the calling task's identifier
    fn current_task(&self) -> Option<Self::TaskId>;

    /// Look up a task by its kernel-registered name
    fn task_find_by_name(&self, name: &str) -> Option<Self::TaskId>;

    /// Suspend the calling task for a number of ticks
    fn task_delay(&self, ticks: Ticks);

    /// Change a task's native priority
    fn task_set_priority(&self, task: Self::TaskId, priority: u32);

    /// Create a queue of `depth` elements of `item_size` bytes
    fn queue_create(&self, depth: u32, item_size: u32) -> Option<Self::QueueId>;

    /// Delete a queue, discarding queued items
    fn queue_delete(&self, queue: Self::QueueId);

    /// Enqueue from task context, waiting up to `wait` ticks for space
    ///
    /// `item` may be shorter than the queue's item size. Implementations
    /// must never read past `item.len()`: copy it into a zero-filled buffer
    /// of the item size first if the native send always copies a full item.
    ///
    /// # Returns
    /// * `true` if the item was enqueued
    /// * `false` if no space became available
    fn queue_send(
        &self,
        queue: Self::QueueId,
        item: &[u8],
        wait: Ticks,
        position: QueuePosition,
    ) -> bool;

    /// Dequeue from task context into `buf`, waiting up to `wait` ticks
    fn queue_receive(&self, queue: Self::QueueId, buf: &mut [u8], wait: Ticks) -> bool;

    /// Enqueue from interrupt context without blocking
    ///
    /// `item` follows the same length contract as [`queue_send`](Self::queue_send).
    fn queue_send_from_isr(
        &self,
        queue: Self::QueueId,
        item: &[u8],
        position: QueuePosition,
    ) -> IsrOutcome;

    /// Dequeue from interrupt context without blocking
    fn queue_receive_from_isr(&self, queue: Self::QueueId, buf: &mut [u8]) -> IsrOutcome;

    /// Request a context switch on interrupt exit
    ///
    /// # Arguments
    /// * `task_woken` - Whether an ISR primitive unblocked a higher-priority task
    fn yield_from_isr(&self, task_woken: bool);
}
