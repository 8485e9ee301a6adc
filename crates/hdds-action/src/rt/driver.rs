// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Epoch-based wake driver.
//!
//! Every signal bumps an epoch counter and wakes all sleepers. A waiter
//! snapshots the epoch before inspecting its entities and then blocks only
//! while the epoch is unchanged, so a signal raised between the inspection
//! and the block is never lost.

use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Wake primitive shared between a waitset and its entities.
#[derive(Debug, Default)]
pub struct WaitDriver {
    epoch: Mutex<u64>,
    condvar: Condvar,
}

impl WaitDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch. Take it *before* polling readiness.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Wake every thread blocked in [`wait_until`](Self::wait_until).
    pub fn notify(&self) {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        self.condvar.notify_all();
    }

    /// Block until the epoch moves past `seen` or `deadline` passes.
    ///
    /// Returns `true` when woken by a signal, `false` on deadline.
    pub fn wait_until(&self, seen: u64, deadline: Option<Instant>) -> bool {
        let mut epoch = self.epoch.lock();
        while *epoch == seen {
            match deadline {
                Some(deadline) => {
                    if self.condvar.wait_until(&mut epoch, deadline).timed_out() {
                        return *epoch != seen;
                    }
                }
                None => self.condvar.wait(&mut epoch),
            }
        }
        true
    }
}
