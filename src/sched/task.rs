// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Task Registry
//!
//! Maps task handles to native kernel tasks and keeps the per-task metadata
//! the kernel does not: creator, requested stack size, effective priority,
//! creation flags and an optional delete hook.
//!
//! # Creation
//!
//! 1. Validate name length and priority
//! 2. Reserve a slot under the guard (checks capacity, then name)
//! 3. Create the native task suspended, outside the guard
//! 4. Populate the slot, or release it if the kernel refused
//! 5. Start the native task
//!
//! The reservation is what keeps two concurrent creates of one name from
//! both succeeding; the release is what keeps a failing kernel from
//! leaking capacity. Starting only after population means a new task that
//! preempts its creator already finds itself registered.

use bitflags::bitflags;
use log::{debug, info, warn};

use crate::config::MAX_TASKS;
use crate::error::{OsalError, OsalResult};
use crate::object::handle::{bounded_name, ObjectId, ObjectName};
use crate::object::table::SlotTable;
use crate::sched::priority::{remap_priority, validate_priority};
use crate::sync::CsCell;
use crate::time::millis_to_ticks;
use crate::traits::{Kernel, StackWord, TaskEntry, TaskParams};

bitflags! {
    /// Task creation flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TaskFlags: u32 {
        /// Task uses the floating-point unit
        const FP_ENABLED = 0x01;
    }
}

/// Hook run when a task is deleted through the registry
pub type DeleteHook = fn();

/// Per-task bookkeeping
#[derive(Debug, Clone, Copy)]
pub struct TaskRecord<T> {
    native: T,
    creator: ObjectId,
    stack_size: u32,
    priority: u32,
    flags: TaskFlags,
    delete_hook: Option<DeleteHook>,
}

/// Snapshot of a task's registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProperties {
    /// Task name
    pub name: ObjectName,
    /// Task that created this one, or `UNDEFINED`
    pub creator: ObjectId,
    /// Requested stack size in bytes
    pub stack_size: u32,
    /// Effective (native) priority
    pub priority: u32,
    /// Creation flags
    pub flags: TaskFlags,
}

/// Task registry
pub struct TaskRegistry<K: Kernel> {
    kernel: K,
    table: CsCell<SlotTable<TaskRecord<K::TaskId>, MAX_TASKS>>,
}

impl<K: Kernel> TaskRegistry<K> {
    /// Create an empty registry over `kernel`
    pub const fn new(kernel: K) -> Self {
        Self {
            kernel,
            table: CsCell::new(SlotTable::new()),
        }
    }

    /// Create and start a named task
    ///
    /// With `stack` the kernel runs the task on the caller's buffer and the
    /// buffer's size replaces `stack_size`; otherwise the kernel allocates
    /// `stack_size` bytes itself. A priority above the native range is
    /// clamped.
    ///
    /// # Returns
    ///
    /// - Ok(handle) of the new task
    /// - Err(NameTooLong) if the name does not fit
    /// - Err(InvalidPriority) if `priority` exceeds `MAX_PRIORITY`
    /// - Err(NoFreeIds) / Err(NameTaken) from reservation
    /// - Err(OsError) if the kernel could not create the task
    pub fn create(
        &self,
        name: &str,
        entry: TaskEntry,
        stack: Option<&'static mut [StackWord]>,
        stack_size: u32,
        priority: u32,
        flags: TaskFlags,
    ) -> OsalResult<ObjectId> {
        if bounded_name(name).is_none() {
            return Err(OsalError::NameTooLong);
        }
        let priority = remap_priority(validate_priority(priority)?, self.kernel.max_priority());
        let creator = self.get_id();

        let index = self.table.lock().reserve(name)?;
        debug!("task: reserved slot {} for {:?}", index, name);

        let stack_size = match &stack {
            Some(stack) => static_stack_bytes(stack),
            None => stack_size,
        };
        let params = TaskParams {
            name,
            entry,
            stack_size,
            priority,
        };
        let native = match stack {
            Some(stack) => self.kernel.task_create_static(&params, stack),
            None => self.kernel.task_create(&params),
        };
        let Some(native) = native else {
            self.table.lock().release(index);
            warn!("task: kernel create failed for {:?}, slot {} released", name, index);
            return Err(OsalError::OsError);
        };

        let record = TaskRecord {
            native,
            creator,
            stack_size,
            priority,
            flags,
            delete_hook: None,
        };
        let Some(id) = self.table.lock().populate(index, record) else {
            self.kernel.task_delete(native);
            return Err(OsalError::OsError);
        };

        info!("task: created {:?} as {} (priority {})", name, id, priority);
        self.kernel.task_start(native);
        Ok(id)
    }

    /// Delete a task
    ///
    /// Runs the task's delete hook first. Deleting the calling task does
    /// not return.
    pub fn delete(&self, id: ObjectId) -> OsalResult<()> {
        let record = self.table.lock().retire(id).ok_or(OsalError::InvalidId)?;

        if let Some(hook) = record.delete_hook {
            hook();
        }

        if self.kernel.current_task() == Some(record.native) {
            self.table.lock().release(id.index());
            info!("task: {} deleted itself", id);
            self.kernel.task_exit();
        }

        self.kernel.task_delete(record.native);
        self.table.lock().release(id.index());

        info!("task: deleted {}", id);
        Ok(())
    }

    /// Terminate the calling task
    ///
    /// The caller's slot is freed before the kernel removes the task.
    pub fn exit(&self) -> ! {
        if let Some(me) = self.kernel.current_task() {
            let mut table = self.table.lock();
            if let Some(id) = table.find(|r| r.native == me) {
                table.remove(id);
                drop(table);
                info!("task: {} exiting", id);
            }
        }
        self.kernel.task_exit()
    }

    /// Get the calling task's handle
    ///
    /// Returns `ObjectId::UNDEFINED` if the caller was not created through
    /// this registry.
    pub fn get_id(&self) -> ObjectId {
        let Some(me) = self.kernel.current_task() else {
            return ObjectId::UNDEFINED;
        };
        self.table
            .lock()
            .find(|r| r.native == me)
            .unwrap_or(ObjectId::UNDEFINED)
    }

    /// Find a task by name
    pub fn get_id_by_name(&self, name: &str) -> OsalResult<ObjectId> {
        if bounded_name(name).is_none() {
            return Err(OsalError::NameTooLong);
        }
        let native = self
            .kernel
            .task_find_by_name(name)
            .ok_or(OsalError::NameNotFound)?;
        self.table
            .lock()
            .find(|r| r.native == native)
            .ok_or(OsalError::NameNotFound)
    }

    /// Suspend the calling task for `millis` milliseconds
    ///
    /// The tick count is truncated, so a delay shorter than one tick
    /// only yields.
    pub fn delay(&self, millis: u32) -> OsalResult<()> {
        let ticks = millis_to_ticks(millis, self.kernel.tick_rate_hz());
        self.kernel.task_delay(ticks);
        Ok(())
    }

    /// Change a task's priority
    pub fn set_priority(&self, id: ObjectId, priority: u32) -> OsalResult<()> {
        let priority = remap_priority(validate_priority(priority)?, self.kernel.max_priority());

        let native = {
            let mut table = self.table.lock();
            let record = table.get_mut(id).ok_or(OsalError::InvalidId)?;
            record.priority = priority;
            record.native
        };

        self.kernel.task_set_priority(native, priority);
        debug!("task: {} priority set to {}", id, priority);
        Ok(())
    }

    /// Register a hook to run when the calling task is deleted
    pub fn install_delete_handler(&self, hook: DeleteHook) -> OsalResult<()> {
        let me = self.kernel.current_task().ok_or(OsalError::InvalidId)?;
        let mut table = self.table.lock();
        let id = table.find(|r| r.native == me).ok_or(OsalError::InvalidId)?;
        if let Some(record) = table.get_mut(id) {
            record.delete_hook = Some(hook);
        }
        Ok(())
    }

    /// Get a task's registration details
    pub fn get_info(&self, id: ObjectId) -> OsalResult<TaskProperties> {
        let table = self.table.lock();
        let record = table.get(id).ok_or(OsalError::InvalidId)?;
        let name = bounded_name(table.name_of(id).unwrap_or_default()).unwrap_or_default();
        Ok(TaskProperties {
            name,
            creator: record.creator,
            stack_size: record.stack_size,
            priority: record.priority,
            flags: record.flags,
        })
    }

    /// Number of unused task slots
    pub fn free_slots(&self) -> usize {
        self.table.lock().free_count()
    }
}

/// Size in bytes of a caller-supplied stack
fn static_stack_bytes(stack: &[StackWord]) -> u32 {
    let bytes = stack.len().saturating_mul(core::mem::size_of::<StackWord>());
    u32::try_from(bytes).unwrap_or(u32::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_API_NAME, MAX_PRIORITY};
    use crate::testing::{SimKernel, TaskExited};
    use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::boxed::Box;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::OnceLock;
    use std::vec;

    fn idle() {}

    fn registry() -> (SimKernel, TaskRegistry<SimKernel>) {
        let sim = SimKernel::new();
        (sim.clone(), TaskRegistry::new(sim))
    }

    fn spawn(tasks: &TaskRegistry<SimKernel>, name: &str) -> OsalResult<ObjectId> {
        tasks.create(name, idle, None, 4096, 10, TaskFlags::empty())
    }

    #[test]
    fn test_create_first_handle_is_zero() {
        let (sim, tasks) = registry();
        let id = spawn(&tasks, "Worker").unwrap();
        assert_eq!(id.into_raw(), 0);
        assert_eq!(sim.task_count(), 1);
        assert_eq!(tasks.free_slots(), MAX_TASKS - 1);
    }

    #[test]
    fn test_create_validation() {
        let (sim, tasks) = registry();
        assert_eq!(
            spawn(&tasks, &"x".repeat(MAX_API_NAME)),
            Err(OsalError::NameTooLong)
        );
        assert_eq!(
            tasks.create("p", idle, None, 4096, MAX_PRIORITY + 1, TaskFlags::empty()),
            Err(OsalError::InvalidPriority)
        );
        assert_eq!(sim.task_count(), 0);
        assert_eq!(tasks.free_slots(), MAX_TASKS);
    }

    #[test]
    fn test_empty_name_accepted() {
        let (_, tasks) = registry();
        let id = spawn(&tasks, "").unwrap();
        assert_eq!(tasks.get_info(id).unwrap().name.as_str(), "");
    }

    #[test]
    fn test_duplicate_name_leaves_slot_free() {
        let (_, tasks) = registry();
        spawn(&tasks, "Worker").unwrap();
        assert_eq!(spawn(&tasks, "Worker"), Err(OsalError::NameTaken));
        assert_eq!(tasks.free_slots(), MAX_TASKS - 1);
    }

    #[test]
    fn test_kernel_failure_rolls_back() {
        let (sim, tasks) = registry();
        sim.fail_next_task_creates(1);
        assert_eq!(spawn(&tasks, "flaky"), Err(OsalError::OsError));
        assert_eq!(tasks.free_slots(), MAX_TASKS);
        assert_eq!(spawn(&tasks, "flaky").unwrap().into_raw(), 0);
    }

    #[test]
    fn test_priority_clamped() {
        let (sim, tasks) = registry();
        let id = tasks
            .create("hi", idle, None, 4096, 200, TaskFlags::FP_ENABLED)
            .unwrap();
        let native = sim.task_find_by_name("hi").unwrap();
        assert_eq!(sim.task_priority(native), Some(SimKernel::DEFAULT_MAX_PRIORITY));

        let info = tasks.get_info(id).unwrap();
        assert_eq!(info.priority, SimKernel::DEFAULT_MAX_PRIORITY);
        assert_eq!(info.flags, TaskFlags::FP_ENABLED);
        assert_eq!(info.stack_size, 4096);
    }

    #[test]
    fn test_static_stack_path() {
        let (sim, tasks) = registry();
        let stack: &'static mut [StackWord] = Box::leak(vec![0; 256].into_boxed_slice());
        // The buffer's size wins over an oversized request
        let id = tasks
            .create("static", idle, Some(stack), 1_000_000, 1, TaskFlags::empty())
            .unwrap();
        let native = sim.task_find_by_name("static").unwrap();
        assert_eq!(sim.task_has_static_stack(native), Some(true));
        assert_eq!(sim.task_stack_size(native), Some(1024));
        assert_eq!(tasks.get_info(id).unwrap().stack_size, 1024);
    }

    #[test]
    fn test_static_stack_failure_rolls_back() {
        let (sim, tasks) = registry();
        let stack: &'static mut [StackWord] = Box::leak(vec![0; 128].into_boxed_slice());
        sim.fail_next_task_creates(1);
        assert_eq!(
            tasks.create("static", idle, Some(stack), 512, 1, TaskFlags::empty()),
            Err(OsalError::OsError)
        );
        assert_eq!(tasks.free_slots(), MAX_TASKS);
        assert_eq!(sim.task_count(), 0);
        assert_eq!(spawn(&tasks, "static").unwrap().into_raw(), 0);
    }

    #[test]
    fn test_task_started_after_registration() {
        let (sim, tasks) = registry();
        spawn(&tasks, "runnable").unwrap();
        let native = sim.task_find_by_name("runnable").unwrap();
        assert_eq!(sim.task_started(native), Some(true));
    }

    static EAGER: OnceLock<(SimKernel, TaskRegistry<SimKernel>)> = OnceLock::new();
    static EAGER_SEEN: AtomicU32 = AtomicU32::new(u32::MAX - 1);

    fn eager() -> &'static (SimKernel, TaskRegistry<SimKernel>) {
        EAGER.get_or_init(|| {
            let sim = SimKernel::new();
            sim.set_preemptive_start(true);
            (sim.clone(), TaskRegistry::new(sim))
        })
    }

    fn eager_entry() {
        let (_, tasks) = eager();
        EAGER_SEEN.store(tasks.get_id().into_raw(), Ordering::SeqCst);
        tasks.exit();
    }

    #[test]
    fn test_preempting_task_sees_its_registration() {
        let (sim, tasks) = eager();
        let id = tasks
            .create("fast", eager_entry, None, 1024, 20, TaskFlags::empty())
            .unwrap();

        // The entry ran inside create, already registered
        assert_eq!(EAGER_SEEN.load(Ordering::SeqCst), id.into_raw());
        assert_eq!(sim.task_count(), 0);
        assert_eq!(tasks.free_slots(), MAX_TASKS);
        assert_eq!(tasks.get_info(id), Err(OsalError::InvalidId));
        assert_eq!(tasks.delete(id), Err(OsalError::InvalidId));
    }

    #[test]
    fn test_delete_and_stale_handle() {
        let (sim, tasks) = registry();
        let old = spawn(&tasks, "a").unwrap();
        tasks.delete(old).unwrap();
        assert_eq!(sim.task_count(), 0);
        assert_eq!(tasks.delete(old), Err(OsalError::InvalidId));

        let new = spawn(&tasks, "b").unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new, old);
        assert_eq!(tasks.set_priority(old, 1), Err(OsalError::InvalidId));
        assert_eq!(tasks.get_info(old), Err(OsalError::InvalidId));
        assert!(tasks.get_info(new).is_ok());
    }

    #[test]
    fn test_get_id_from_task() {
        let (sim, tasks) = registry();
        assert_eq!(tasks.get_id(), ObjectId::UNDEFINED);

        let id = spawn(&tasks, "me").unwrap();
        let native = sim.task_find_by_name("me").unwrap();
        assert_eq!(sim.run_as(native, || tasks.get_id()), id);
    }

    #[test]
    fn test_creator_recorded() {
        let (sim, tasks) = registry();
        let parent = spawn(&tasks, "parent").unwrap();
        let native = sim.task_find_by_name("parent").unwrap();
        let child = sim.run_as(native, || spawn(&tasks, "child")).unwrap();

        assert_eq!(tasks.get_info(child).unwrap().creator, parent);
        assert_eq!(tasks.get_info(parent).unwrap().creator, ObjectId::UNDEFINED);
    }

    #[test]
    fn test_get_id_by_name() {
        let (_, tasks) = registry();
        let id = spawn(&tasks, "finder").unwrap();
        assert_eq!(tasks.get_id_by_name("finder"), Ok(id));
        assert_eq!(tasks.get_id_by_name("nobody"), Err(OsalError::NameNotFound));
        assert_eq!(
            tasks.get_id_by_name(&"f".repeat(MAX_API_NAME)),
            Err(OsalError::NameTooLong)
        );
    }

    #[test]
    fn test_delay_converts_to_ticks() {
        let sim = SimKernel::with_config(100, 24);
        let tasks = TaskRegistry::new(sim.clone());
        tasks.delay(250).unwrap();
        tasks.delay(5).unwrap();
        assert_eq!(sim.delays(), vec![25, 0]);
    }

    #[test]
    fn test_set_priority_updates_record() {
        let (sim, tasks) = registry();
        let id = spawn(&tasks, "prio").unwrap();
        let native = sim.task_find_by_name("prio").unwrap();

        tasks.set_priority(id, 3).unwrap();
        assert_eq!(sim.task_priority(native), Some(3));
        assert_eq!(tasks.get_info(id).unwrap().priority, 3);

        tasks.set_priority(id, 255).unwrap();
        assert_eq!(tasks.get_info(id).unwrap().priority, SimKernel::DEFAULT_MAX_PRIORITY);

        assert_eq!(tasks.set_priority(id, 256), Err(OsalError::InvalidPriority));
    }

    static HOOK_RUNS: AtomicUsize = AtomicUsize::new(0);

    fn count_hook() {
        HOOK_RUNS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_delete_hook_runs_once() {
        let (sim, tasks) = registry();
        let id = spawn(&tasks, "hooked").unwrap();
        let native = sim.task_find_by_name("hooked").unwrap();

        assert_eq!(tasks.install_delete_handler(count_hook), Err(OsalError::InvalidId));
        sim.run_as(native, || tasks.install_delete_handler(count_hook)).unwrap();

        tasks.delete(id).unwrap();
        assert_eq!(tasks.delete(id), Err(OsalError::InvalidId));
        assert_eq!(HOOK_RUNS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exit_frees_slot() {
        let (sim, tasks) = registry();
        let id = spawn(&tasks, "leaver").unwrap();
        let native = sim.task_find_by_name("leaver").unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sim.run_as(native, || tasks.exit());
        }));
        let payload = result.unwrap_err();
        assert_eq!(
            payload.downcast_ref::<TaskExited>(),
            Some(&TaskExited(Some(native)))
        );

        assert!(!sim.task_alive(native));
        assert_eq!(tasks.free_slots(), MAX_TASKS);
        assert_eq!(tasks.get_info(id), Err(OsalError::InvalidId));
    }

    #[test]
    fn test_self_delete_exits() {
        let (sim, tasks) = registry();
        let id = spawn(&tasks, "self").unwrap();
        let native = sim.task_find_by_name("self").unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sim.run_as(native, || {
                let _ = tasks.delete(id);
            });
        }));
        assert!(result.is_err());
        assert!(!sim.task_alive(native));
        assert_eq!(tasks.free_slots(), MAX_TASKS);
    }
}
