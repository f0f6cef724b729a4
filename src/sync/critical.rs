// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Critical-Section Guard
//!
//! Scoped mutual exclusion between task-context callers and interrupt
//! handlers. Entering masks preemption through the `critical-section`
//! backend registered for the target; dropping the guard restores the
//! previous state on every exit path.
//!
//! Hold times must stay bounded: never call a blocking kernel primitive
//! while a guard is alive.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

/// RAII critical section
///
/// Guards must be dropped in the reverse order they were entered, which
/// scoped use guarantees.
pub struct CriticalSection {
    restore: critical_section::RestoreState,
    // Restoring on another CPU or thread would unmask the wrong context
    _not_send: PhantomData<*mut ()>,
}

impl CriticalSection {
    /// Enter a critical section
    #[inline]
    pub fn enter() -> Self {
        // SAFETY: the matching release happens in Drop, in LIFO order
        // because the guard is !Send and scope-bound.
        let restore = unsafe { critical_section::acquire() };
        Self {
            restore,
            _not_send: PhantomData,
        }
    }
}

impl Drop for CriticalSection {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `restore` came from the acquire in `enter`.
        unsafe { critical_section::release(self.restore) }
    }
}

/// Data accessible only inside a critical section
pub struct CsCell<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for CsCell<T> {}
unsafe impl<T: Send> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    /// Create a new cell
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Enter a critical section and borrow the contents
    ///
    /// # Panics
    ///
    /// Panics if this cell is already borrowed by the current context.
    /// Critical-section backends are re-entrant, so a nested `lock` would
    /// otherwise alias the exclusive borrow.
    pub fn lock(&self) -> CsGuard<'_, T> {
        let cs = CriticalSection::enter();
        if self.locked.swap(true, Ordering::Acquire) {
            panic!("CsCell locked re-entrantly");
        }
        CsGuard { cell: self, _cs: cs }
    }

    /// Check if the cell is currently borrowed
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

/// RAII borrow of a [`CsCell`]
pub struct CsGuard<'a, T> {
    cell: &'a CsCell<T>,
    _cs: CriticalSection,
}

impl<'a, T> Drop for CsGuard<'a, T> {
    fn drop(&mut self) {
        // Runs before `_cs` is dropped, so the flag clears inside the section
        self.cell.locked.store(false, Ordering::Release);
    }
}

impl<'a, T> Deref for CsGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.cell.data.get() }
    }
}

impl<'a, T> DerefMut for CsGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.cell.data.get() }
    }
}

// ============================================================================
// Tests
// ============================================================================
