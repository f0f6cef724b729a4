// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Simulation kernel
//!
//! A hosted [`Kernel`] implementation used to exercise the registries
//! without a real scheduler. Tasks are bookkeeping entries; their entry
//! points only run when a test calls [`SimKernel::run_task`], or at
//! [`Kernel::task_start`] when preemptive start is enabled. Queues are
//! real bounded FIFOs, and task-context waits genuinely block the calling
//! thread, so producer/consumer behaviour can be tested across threads.
//!
//! The caller's identity and execution context are thread-local:
//!
//! - [`SimKernel::run_as`] runs a closure as a given native task
//! - [`SimKernel::in_isr`] runs a closure in emulated interrupt context;
//!   any blocking primitive called there panics
//!
//! Failure injection makes the next N task or queue creations fail.
//! [`SimKernel::set_preemptive_start`] makes `task_start` run the new task's
//! entry before returning, as a kernel would for a task that outranks its
//! creator.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::boxed::Box;
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::string::{String, ToString};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::LocalKey;
use std::time::{Duration, Instant};
use std::vec::Vec;

use crate::traits::{
    IsrOutcome, Kernel, QueuePosition, StackWord, TaskEntry, TaskParams, Ticks, WAIT_FOREVER,
};

/// Native task identifier of the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimTaskId(u32);

/// Native queue identifier of the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimQueueId(u32);

/// Unwind payload raised by [`Kernel::task_exit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskExited(pub Option<SimTaskId>);

std::thread_local! {
    static CURRENT_TASK: Cell<Option<SimTaskId>> = const { Cell::new(None) };
    static IN_ISR: Cell<bool> = const { Cell::new(false) };
}

/// Restores a thread-local on drop, including during unwinding
struct Restore<T: Copy + 'static> {
    key: &'static LocalKey<Cell<T>>,
    prev: T,
}

impl<T: Copy + 'static> Restore<T> {
    fn set(key: &'static LocalKey<Cell<T>>, value: T) -> Self {
        let prev = key.with(|c| c.replace(value));
        Self { key, prev }
    }
}

impl<T: Copy + 'static> Drop for Restore<T> {
    fn drop(&mut self) {
        self.key.with(|c| c.set(self.prev));
    }
}

fn in_isr() -> bool {
    IN_ISR.with(|c| c.get())
}

fn current() -> Option<SimTaskId> {
    CURRENT_TASK.with(|c| c.get())
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// ============================================================================
/// Simulated objects
/// ============================================================================

struct SimTask {
    id: SimTaskId,
    name: String,
    entry: TaskEntry,
    priority: u32,
    stack_size: u32,
    static_stack: bool,
    started: bool,
}

struct SimQueue {
    id: SimQueueId,
    depth: usize,
    item_size: usize,
    items: VecDeque<Vec<u8>>,
    waiters: usize,
}

impl SimQueue {
    fn push(&mut self, item: &[u8], position: QueuePosition) -> bool {
        if self.items.len() >= self.depth {
            return false;
        }
        let mut stored = std::vec![0u8; self.item_size];
        let len = item.len().min(self.item_size);
        stored[..len].copy_from_slice(&item[..len]);
        match position {
            QueuePosition::Back => self.items.push_back(stored),
            QueuePosition::Front => self.items.push_front(stored),
        }
        true
    }

    fn pop(&mut self, buf: &mut [u8]) -> bool {
        match self.items.pop_front() {
            Some(item) => {
                let len = item.len().min(buf.len());
                buf[..len].copy_from_slice(&item[..len]);
                true
            }
            None => false,
        }
    }
}

struct SimInner {
    tick_rate_hz: u32,
    max_priority: u32,

    tasks: spin::Mutex<Vec<SimTask>>,
    next_task: AtomicU32,
    task_create_failures: AtomicU32,
    preemptive_start: AtomicBool,

    queues: Mutex<Vec<SimQueue>>,
    queue_changed: Condvar,
    next_queue: AtomicU32,
    queue_create_failures: AtomicU32,

    delays: spin::Mutex<Vec<Ticks>>,
    last_send_wait: spin::Mutex<Option<Ticks>>,
    last_receive_wait: spin::Mutex<Option<Ticks>>,
    isr_yield_calls: AtomicUsize,
    isr_task_woken: AtomicUsize,
}

/// ============================================================================
/// Simulation kernel
/// ============================================================================

/// Hosted kernel for tests
///
/// Cloning yields another handle to the same simulated kernel.
#[derive(Clone)]
pub struct SimKernel {
    inner: Arc<SimInner>,
}

impl SimKernel {
    /// Default tick rate (Hz)
    pub const DEFAULT_TICK_RATE_HZ: u32 = 1000;

    /// Default highest native priority
    pub const DEFAULT_MAX_PRIORITY: u32 = 24;

    /// Create a simulator with default tick rate and priority range
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_TICK_RATE_HZ, Self::DEFAULT_MAX_PRIORITY)
    }

    /// Create a simulator with a specific tick rate and priority range
    pub fn with_config(tick_rate_hz: u32, max_priority: u32) -> Self {
        Self {
            inner: Arc::new(SimInner {
                tick_rate_hz,
                max_priority,
                tasks: spin::Mutex::new(Vec::new()),
                next_task: AtomicU32::new(1),
                task_create_failures: AtomicU32::new(0),
                preemptive_start: AtomicBool::new(false),
                queues: Mutex::new(Vec::new()),
                queue_changed: Condvar::new(),
                next_queue: AtomicU32::new(1),
                queue_create_failures: AtomicU32::new(0),
                delays: spin::Mutex::new(Vec::new()),
                last_send_wait: spin::Mutex::new(None),
                last_receive_wait: spin::Mutex::new(None),
                isr_yield_calls: AtomicUsize::new(0),
                isr_task_woken: AtomicUsize::new(0),
            }),
        }
    }

    /// Make the next `count` task creations fail
    pub fn fail_next_task_creates(&self, count: u32) {
        self.inner.task_create_failures.store(count, Ordering::SeqCst);
    }

    /// Run a task's entry inside `task_start`
    ///
    /// An exit from the entry is absorbed so `task_start` still returns.
    pub fn set_preemptive_start(&self, enabled: bool) {
        self.inner.preemptive_start.store(enabled, Ordering::SeqCst);
    }

    /// Make the next `count` queue creations fail
    pub fn fail_next_queue_creates(&self, count: u32) {
        self.inner.queue_create_failures.store(count, Ordering::SeqCst);
    }

    /// Run a closure as the given native task
    pub fn run_as<R>(&self, task: SimTaskId, f: impl FnOnce() -> R) -> R {
        let _restore = Restore::set(&CURRENT_TASK, Some(task));
        f()
    }

    /// Run a closure in emulated interrupt context
    pub fn in_isr<R>(&self, f: impl FnOnce() -> R) -> R {
        let _restore = Restore::set(&IN_ISR, true);
        f()
    }

    /// Run a task's entry point as that task
    ///
    /// # Returns
    ///
    /// - Ok(()) if the entry point returned
    /// - Err(TaskExited) if the task exited through [`Kernel::task_exit`]
    pub fn run_task(&self, task: SimTaskId) -> Result<(), TaskExited> {
        let entry = self
            .inner
            .tasks
            .lock()
            .iter()
            .find(|t| t.id == task)
            .map(|t| t.entry);
        let Some(entry) = entry else {
            return Ok(());
        };

        match panic::catch_unwind(AssertUnwindSafe(|| self.run_as(task, entry))) {
            Ok(()) => Ok(()),
            Err(payload) => match payload.downcast::<TaskExited>() {
                Ok(exited) => Err(*exited),
                Err(other) => panic::resume_unwind(other),
            },
        }
    }

    /// Check if a native task exists
    pub fn task_alive(&self, task: SimTaskId) -> bool {
        self.inner.tasks.lock().iter().any(|t| t.id == task)
    }

    /// Get a native task's priority
    pub fn task_priority(&self, task: SimTaskId) -> Option<u32> {
        self.inner.tasks.lock().iter().find(|t| t.id == task).map(|t| t.priority)
    }

    /// Get a native task's requested stack size
    pub fn task_stack_size(&self, task: SimTaskId) -> Option<u32> {
        self.inner.tasks.lock().iter().find(|t| t.id == task).map(|t| t.stack_size)
    }

    /// Check if a native task runs on a caller-supplied stack
    pub fn task_has_static_stack(&self, task: SimTaskId) -> Option<bool> {
        self.inner.tasks.lock().iter().find(|t| t.id == task).map(|t| t.static_stack)
    }

    /// Check if a native task has been started
    pub fn task_started(&self, task: SimTaskId) -> Option<bool> {
        self.inner.tasks.lock().iter().find(|t| t.id == task).map(|t| t.started)
    }

    /// Number of live native tasks
    pub fn task_count(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Number of live native queues
    pub fn queue_count(&self) -> usize {
        self.lock_queues().len()
    }

    /// Number of items waiting in a native queue
    pub fn queue_len(&self, queue: SimQueueId) -> Option<usize> {
        self.lock_queues().iter().find(|q| q.id == queue).map(|q| q.items.len())
    }

    /// Number of tasks blocked on a native queue
    pub fn queue_waiters(&self, queue: SimQueueId) -> Option<usize> {
        self.lock_queues().iter().find(|q| q.id == queue).map(|q| q.waiters)
    }

    /// Tick counts passed to `task_delay`, oldest first
    pub fn delays(&self) -> Vec<Ticks> {
        self.inner.delays.lock().clone()
    }

    /// Wait passed to the most recent task-context send
    pub fn last_send_wait(&self) -> Option<Ticks> {
        *self.inner.last_send_wait.lock()
    }

    /// Wait passed to the most recent task-context receive
    pub fn last_receive_wait(&self) -> Option<Ticks> {
        *self.inner.last_receive_wait.lock()
    }

    /// Number of `yield_from_isr` calls
    pub fn isr_yield_calls(&self) -> usize {
        self.inner.isr_yield_calls.load(Ordering::SeqCst)
    }

    /// Number of `yield_from_isr` calls that requested a switch
    pub fn isr_task_woken(&self) -> usize {
        self.inner.isr_task_woken.load(Ordering::SeqCst)
    }

    fn lock_queues(&self) -> MutexGuard<'_, Vec<SimQueue>> {
        self.inner.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ticks_to_duration(&self, ticks: Ticks) -> Duration {
        let rate = self.inner.tick_rate_hz.max(1) as u64;
        Duration::from_millis(ticks as u64 * 1000 / rate)
    }

    fn spawn(&self, params: &TaskParams<'_>, static_stack: bool) -> Option<SimTaskId> {
        if take_failure(&self.inner.task_create_failures) {
            return None;
        }
        let id = SimTaskId(self.inner.next_task.fetch_add(1, Ordering::SeqCst));
        self.inner.tasks.lock().push(SimTask {
            id,
            name: params.name.to_string(),
            entry: params.entry,
            priority: params.priority.min(self.inner.max_priority),
            stack_size: params.stack_size,
            static_stack,
            started: false,
        });
        Some(id)
    }

    /// Retry `attempt` until it succeeds, the queue disappears, or `wait`
    /// ticks elapse
    fn transfer<F>(&self, queue: SimQueueId, wait: Ticks, mut attempt: F) -> bool
    where
        F: FnMut(&mut SimQueue) -> bool,
    {
        let deadline =
            (wait != WAIT_FOREVER).then(|| Instant::now() + self.ticks_to_duration(wait));
        let mut queues = self.lock_queues();

        loop {
            let Some(q) = queues.iter_mut().find(|q| q.id == queue) else {
                return false;
            };
            if attempt(q) {
                self.inner.queue_changed.notify_all();
                return true;
            }
            if wait == 0 {
                return false;
            }

            let remaining = match deadline {
                None => None,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    Some(deadline - now)
                }
            };

            q.waiters += 1;
            queues = match remaining {
                None => self
                    .inner
                    .queue_changed
                    .wait(queues)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(remaining) => {
                    self.inner
                        .queue_changed
                        .wait_timeout(queues, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
            if let Some(q) = queues.iter_mut().find(|q| q.id == queue) {
                q.waiters -= 1;
            }
        }
    }
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for SimKernel {
    type TaskId = SimTaskId;
    type QueueId = SimQueueId;

    fn tick_rate_hz(&self) -> u32 {
        self.inner.tick_rate_hz
    }

    fn max_priority(&self) -> u32 {
        self.inner.max_priority
    }

    fn in_interrupt(&self) -> bool {
        in_isr()
    }

    fn task_create(&self, params: &TaskParams<'_>) -> Option<SimTaskId> {
        self.spawn(params, false)
    }

    fn task_create_static(
        &self,
        params: &TaskParams<'_>,
        _stack: &'static mut [StackWord],
    ) -> Option<SimTaskId> {
        self.spawn(params, true)
    }

    fn task_start(&self, task: SimTaskId) {
        let found = match self.inner.tasks.lock().iter_mut().find(|t| t.id == task) {
            Some(t) => {
                t.started = true;
                true
            }
            None => false,
        };
        if found && self.inner.preemptive_start.load(Ordering::SeqCst) {
            let _ = self.run_task(task);
        }
    }

    fn task_delete(&self, task: SimTaskId) {
        self.inner.tasks.lock().retain(|t| t.id != task);
    }

    fn task_exit(&self) -> ! {
        let me = current();
        if let Some(id) = me {
            self.task_delete(id);
        }
        panic::resume_unwind(Box::new(TaskExited(me)))
    }

    fn current_task(&self) -> Option<SimTaskId> {
        current()
    }

    fn task_find_by_name(&self, name: &str) -> Option<SimTaskId> {
        self.inner.tasks.lock().iter().find(|t| t.name == name).map(|t| t.id)
    }

    fn task_delay(&self, ticks: Ticks) {
        assert!(!in_isr(), "task_delay called from interrupt context");
        self.inner.delays.lock().push(ticks);
    }

    fn task_set_priority(&self, task: SimTaskId, priority: u32) {
        let max = self.inner.max_priority;
        if let Some(t) = self.inner.tasks.lock().iter_mut().find(|t| t.id == task) {
            t.priority = priority.min(max);
        }
    }

    fn queue_create(&self, depth: u32, item_size: u32) -> Option<SimQueueId> {
        if take_failure(&self.inner.queue_create_failures) {
            return None;
        }
        let id = SimQueueId(self.inner.next_queue.fetch_add(1, Ordering::SeqCst));
        self.lock_queues().push(SimQueue {
            id,
            depth: depth as usize,
            item_size: item_size as usize,
            items: VecDeque::new(),
            waiters: 0,
        });
        Some(id)
    }

    fn queue_delete(&self, queue: SimQueueId) {
        self.lock_queues().retain(|q| q.id != queue);
        self.inner.queue_changed.notify_all();
    }

    fn queue_send(
        &self,
        queue: SimQueueId,
        item: &[u8],
        wait: Ticks,
        position: QueuePosition,
    ) -> bool {
        assert!(!in_isr(), "queue_send called from interrupt context");
        *self.inner.last_send_wait.lock() = Some(wait);
        self.transfer(queue, wait, |q| q.push(item, position))
    }

    fn queue_receive(&self, queue: SimQueueId, buf: &mut [u8], wait: Ticks) -> bool {
        assert!(!in_isr(), "queue_receive called from interrupt context");
        *self.inner.last_receive_wait.lock() = Some(wait);
        self.transfer(queue, wait, |q| q.pop(buf))
    }

    fn queue_send_from_isr(
        &self,
        queue: SimQueueId,
        item: &[u8],
        position: QueuePosition,
    ) -> IsrOutcome {
        let mut queues = self.lock_queues();
        let Some(q) = queues.iter_mut().find(|q| q.id == queue) else {
            return IsrOutcome::default();
        };
        let completed = q.push(item, position);
        let task_woken = completed && q.waiters > 0;
        drop(queues);
        if completed {
            self.inner.queue_changed.notify_all();
        }
        IsrOutcome { completed, task_woken }
    }

    fn queue_receive_from_isr(&self, queue: SimQueueId, buf: &mut [u8]) -> IsrOutcome {
        let mut queues = self.lock_queues();
        let Some(q) = queues.iter_mut().find(|q| q.id == queue) else {
            return IsrOutcome::default();
        };
        let completed = q.pop(buf);
        let task_woken = completed && q.waiters > 0;
        drop(queues);
        if completed {
            self.inner.queue_changed.notify_all();
        }
        IsrOutcome { completed, task_woken }
    }

    fn yield_from_isr(&self, task_woken: bool) {
        self.inner.isr_yield_calls.fetch_add(1, Ordering::SeqCst);
        if task_woken {
            self.inner.isr_task_woken.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn idle() {}

    fn params(name: &str) -> TaskParams<'_> {
        TaskParams {
            name,
            entry: idle,
            stack_size: 1024,
            priority: 5,
        }
    }

    #[test]
    fn test_task_lifecycle() {
        let sim = SimKernel::new();
        let id = sim.task_create(&params("sim")).unwrap();
        assert!(sim.task_alive(id));
        assert_eq!(sim.task_find_by_name("sim"), Some(id));
        assert_eq!(sim.task_priority(id), Some(5));
        assert_eq!(sim.task_has_static_stack(id), Some(false));
        assert_eq!(sim.task_started(id), Some(false));
        sim.task_start(id);
        assert_eq!(sim.task_started(id), Some(true));

        sim.task_delete(id);
        assert!(!sim.task_alive(id));
        assert_eq!(sim.task_count(), 0);
    }

    #[test]
    fn test_failure_injection() {
        let sim = SimKernel::new();
        sim.fail_next_task_creates(1);
        assert!(sim.task_create(&params("a")).is_none());
        assert!(sim.task_create(&params("a")).is_some());

        sim.fail_next_queue_creates(2);
        assert!(sim.queue_create(1, 1).is_none());
        assert!(sim.queue_create(1, 1).is_none());
        assert!(sim.queue_create(1, 1).is_some());
    }

    static STARTS: AtomicUsize = AtomicUsize::new(0);

    fn quit_on_start() {
        STARTS.fetch_add(1, Ordering::SeqCst);
        panic::resume_unwind(Box::new(TaskExited(None)));
    }

    #[test]
    fn test_preemptive_start_runs_entry() {
        let sim = SimKernel::new();
        sim.set_preemptive_start(true);
        let id = sim
            .task_create(&TaskParams {
                name: "eager",
                entry: quit_on_start,
                stack_size: 512,
                priority: 1,
            })
            .unwrap();
        assert_eq!(STARTS.load(Ordering::SeqCst), 0);
        sim.task_start(id);
        assert_eq!(STARTS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_as_sets_identity() {
        let sim = SimKernel::new();
        let id = sim.task_create(&params("me")).unwrap();
        assert_eq!(sim.current_task(), None);
        sim.run_as(id, || assert_eq!(sim.current_task(), Some(id)));
        assert_eq!(sim.current_task(), None);
    }

    #[test]
    fn test_task_exit_unwinds() {
        let sim = SimKernel::new();
        let id = sim.task_create(&params("quitter")).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sim.run_as(id, || sim.task_exit());
        }));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<TaskExited>(), Some(&TaskExited(Some(id))));
        assert!(!sim.task_alive(id));
        assert_eq!(sim.current_task(), None);
    }

    #[test]
    fn test_queue_fifo_and_padding() {
        let sim = SimKernel::new();
        let q = sim.queue_create(3, 4).unwrap();
        assert!(sim.queue_send(q, &[1, 2, 3, 4], 0, QueuePosition::Back));
        assert!(sim.queue_send(q, &[9], 0, QueuePosition::Back));
        assert!(sim.queue_send(q, &[7, 7, 7, 7], 0, QueuePosition::Front));
        assert!(!sim.queue_send(q, &[1], 0, QueuePosition::Back));
        assert_eq!(sim.queue_len(q), Some(3));

        let mut buf = [0u8; 4];
        assert!(sim.queue_receive(q, &mut buf, 0));
        assert_eq!(buf, [7, 7, 7, 7]);
        assert!(sim.queue_receive(q, &mut buf, 0));
        assert_eq!(buf, [1, 2, 3, 4]);
        assert!(sim.queue_receive(q, &mut buf, 0));
        assert_eq!(buf, [9, 0, 0, 0]);
        assert!(!sim.queue_receive(q, &mut buf, 0));
    }

    #[test]
    fn test_timed_receive_expires() {
        let sim = SimKernel::new();
        let q = sim.queue_create(1, 1).unwrap();
        let start = Instant::now();
        let mut buf = [0u8; 1];
        assert!(!sim.queue_receive(q, &mut buf, 20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_blocking_receive_wakes_on_send() {
        let sim = SimKernel::new();
        let q = sim.queue_create(1, 1).unwrap();

        let consumer = {
            let sim = sim.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 1];
                let ok = sim.queue_receive(q, &mut buf, WAIT_FOREVER);
                (ok, buf[0])
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(sim.queue_send(q, &[42], 0, QueuePosition::Back));
        assert_eq!(consumer.join().unwrap(), (true, 42));
    }

    #[test]
    fn test_isr_send_wakes_waiter() {
        let sim = SimKernel::new();
        let q = sim.queue_create(1, 1).unwrap();

        let consumer = {
            let sim = sim.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 1];
                sim.queue_receive(q, &mut buf, WAIT_FOREVER)
            })
        };

        while sim.queue_waiters(q) == Some(0) {
            thread::yield_now();
        }
        let outcome = sim.in_isr(|| sim.queue_send_from_isr(q, &[1], QueuePosition::Back));
        assert!(outcome.completed);
        assert!(outcome.task_woken);

        sim.yield_from_isr(outcome.task_woken);
        assert_eq!(sim.isr_task_woken(), 1);
        assert!(consumer.join().unwrap());
    }

    #[test]
    fn test_delete_releases_blocked_receiver() {
        let sim = SimKernel::new();
        let q = sim.queue_create(1, 1).unwrap();

        let consumer = {
            let sim = sim.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 1];
                sim.queue_receive(q, &mut buf, WAIT_FOREVER)
            })
        };

        thread::sleep(Duration::from_millis(20));
        sim.queue_delete(q);
        assert!(!consumer.join().unwrap());
    }

    #[test]
    fn test_blocking_primitive_in_isr_panics() {
        let sim = SimKernel::new();
        let q = sim.queue_create(1, 1).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sim.in_isr(|| {
                let mut buf = [0u8; 1];
                sim.queue_receive(q, &mut buf, 0)
            })
        }));
        assert!(result.is_err());
        assert!(!sim.in_interrupt());
    }
}
