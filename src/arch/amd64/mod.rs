// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! AMD64 critical section
//!
//! Single-core backend: entering saves RFLAGS.IF and executes `cli`;
//! releasing re-enables interrupts only if they were enabled on entry, so
//! nested sections restore correctly.
//!
//! Registered only on bare-metal targets (`target_os = "none"`); hosted
//! builds cannot execute `cli` in user mode.

#[cfg(target_os = "none")]
mod cs_impl {
    use critical_section::{set_impl, Impl, RawRestoreState};
    use x86_64::instructions::interrupts;

    struct Amd64CriticalSection;
    set_impl!(Amd64CriticalSection);

    unsafe impl Impl for Amd64CriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_enabled = interrupts::are_enabled();
            interrupts::disable();
            was_enabled
        }

        unsafe fn release(was_enabled: RawRestoreState) {
            if was_enabled {
                interrupts::enable();
            }
        }
    }
}
