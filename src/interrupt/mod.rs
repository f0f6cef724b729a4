// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Context-sensitive dispatch
//!
//! Queue transfers must use different kernel primitives depending on who is
//! calling. A task may block; an interrupt handler has no task to suspend and
//! must use the kernel's ISR-safe entry points. The decision is taken fresh
//! on every call because the same code path can be reached from both.

use log::trace;

use crate::traits::{Kernel, QueuePosition, Ticks};

/// Where the caller is executing
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Schedulable task; may block
    Task = 0,
    /// Interrupt service routine; must not block
    Interrupt = 1,
}

impl ExecutionContext {
    /// Query the kernel for the caller's context
    pub fn current<K: Kernel>(kernel: &K) -> Self {
        if kernel.in_interrupt() {
            Self::Interrupt
        } else {
            Self::Task
        }
    }

    /// Check if blocking is permitted
    pub const fn can_block(self) -> bool {
        matches!(self, Self::Task)
    }

    /// Send through the strategy for this context
    pub fn send<K: Kernel>(
        self,
        kernel: &K,
        queue: K::QueueId,
        item: &[u8],
        position: QueuePosition,
    ) -> bool {
        trace!("queue send via {:?} strategy", self);
        match self {
            Self::Task => TaskStrategy::send(kernel, queue, item, position),
            Self::Interrupt => IsrStrategy::send(kernel, queue, item, position),
        }
    }

    /// Receive through the strategy for this context
    ///
    /// `wait` is honoured only in task context.
    pub fn receive<K: Kernel>(
        self,
        kernel: &K,
        queue: K::QueueId,
        buf: &mut [u8],
        wait: Ticks,
    ) -> bool {
        trace!("queue receive via {:?} strategy", self);
        match self {
            Self::Task => TaskStrategy::receive(kernel, queue, buf, wait),
            Self::Interrupt => IsrStrategy::receive(kernel, queue, buf, wait),
        }
    }
}

/// Stateless transfer strategy for one execution context
pub trait TransferStrategy {
    /// Enqueue without waiting for space
    fn send<K: Kernel>(kernel: &K, queue: K::QueueId, item: &[u8], position: QueuePosition)
        -> bool;

    /// Dequeue, waiting up to `wait` ticks where the context allows it
    fn receive<K: Kernel>(kernel: &K, queue: K::QueueId, buf: &mut [u8], wait: Ticks) -> bool;
}

/// Task-context primitives
pub struct TaskStrategy;

impl TransferStrategy for TaskStrategy {
    fn send<K: Kernel>(
        kernel: &K,
        queue: K::QueueId,
        item: &[u8],
        position: QueuePosition,
    ) -> bool {
        // Producers never block, whatever timeout the caller has in mind
        kernel.queue_send(queue, item, 0, position)
    }

    fn receive<K: Kernel>(kernel: &K, queue: K::QueueId, buf: &mut [u8], wait: Ticks) -> bool {
        kernel.queue_receive(queue, buf, wait)
    }
}

/// Interrupt-context primitives
pub struct IsrStrategy;

impl TransferStrategy for IsrStrategy {
    fn send<K: Kernel>(
        kernel: &K,
        queue: K::QueueId,
        item: &[u8],
        position: QueuePosition,
    ) -> bool {
        let outcome = kernel.queue_send_from_isr(queue, item, position);
        kernel.yield_from_isr(outcome.task_woken);
        outcome.completed
    }

    fn receive<K: Kernel>(kernel: &K, queue: K::QueueId, buf: &mut [u8], _wait: Ticks) -> bool {
        let outcome = kernel.queue_receive_from_isr(queue, buf);
        kernel.yield_from_isr(outcome.task_woken);
        outcome.completed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimKernel;
    use crate::traits::WAIT_FOREVER;

    #[test]
    fn test_context_follows_kernel() {
        let sim = SimKernel::new();
        assert_eq!(ExecutionContext::current(&sim), ExecutionContext::Task);
        sim.in_isr(|| {
            assert_eq!(ExecutionContext::current(&sim), ExecutionContext::Interrupt);
        });
        // Not cached across calls
        assert_eq!(ExecutionContext::current(&sim), ExecutionContext::Task);
    }

    #[test]
    fn test_can_block() {
        assert!(ExecutionContext::Task.can_block());
        assert!(!ExecutionContext::Interrupt.can_block());
    }

    #[test]
    fn test_isr_receive_ignores_wait() {
        let sim = SimKernel::new();
        let q = sim.queue_create(2, 1).unwrap();
        // The simulator panics on a blocking receive in ISR context
        let got = sim.in_isr(|| {
            let mut buf = [0u8; 1];
            ExecutionContext::current(&sim).receive(&sim, q, &mut buf, WAIT_FOREVER)
        });
        assert!(!got);
    }

    #[test]
    fn test_isr_send_requests_yield() {
        let sim = SimKernel::new();
        let q = sim.queue_create(2, 1).unwrap();
        let sent = sim.in_isr(|| {
            ExecutionContext::Interrupt.send(&sim, q, &[5], QueuePosition::Back)
        });
        assert!(sent);
        assert_eq!(sim.isr_yield_calls(), 1);
    }

    #[test]
    fn test_task_send_never_waits() {
        let sim = SimKernel::new();
        let q = sim.queue_create(1, 1).unwrap();
        assert!(ExecutionContext::Task.send(&sim, q, &[1], QueuePosition::Back));
        assert!(!ExecutionContext::Task.send(&sim, q, &[2], QueuePosition::Back));
        assert_eq!(sim.last_send_wait(), Some(0));
    }
}
