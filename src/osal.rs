// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! OSAL facade
//!
//! Bundles the task and queue registries over one kernel. Both registries
//! hold their own copy of the kernel handle, so `K` is usually a cheap
//! handle type (a unit struct on bare metal, a shared pointer when hosted).

use crate::object::QueueRegistry;
use crate::sched::TaskRegistry;
use crate::traits::Kernel;

/// Task and queue registries over one kernel
pub struct Osal<K: Kernel + Clone> {
    tasks: TaskRegistry<K>,
    queues: QueueRegistry<K>,
}

impl<K: Kernel + Clone> Osal<K> {
    /// Create empty registries over `kernel`
    pub fn new(kernel: K) -> Self {
        log::debug!("osal: registries initialized");
        Self {
            tasks: TaskRegistry::new(kernel.clone()),
            queues: QueueRegistry::new(kernel),
        }
    }

    /// Task registry
    pub fn tasks(&self) -> &TaskRegistry<K> {
        &self.tasks
    }

    /// Queue registry
    pub fn queues(&self) -> &QueueRegistry<K> {
        &self.queues
    }
}
