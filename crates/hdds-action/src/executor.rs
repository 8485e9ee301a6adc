// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-threaded reference executor.
//!
//! Each cycle rebuilds a [`WaitSet`] sized from the registered waitables,
//! blocks once, then runs `update` on every waitable before executing the
//! ready ones. An interrupt guard condition is part of every cycle so
//! [`Executor::wake`] and [`Executor::shutdown`] reach a blocked wait from
//! any thread. Thread-pool policy is left to callers: run several
//! executors, each on its own thread, if parallel dispatch is needed.

use crate::config::{ExecutorOptions, SPIN_INITIAL_BACKOFF_MS, SPIN_MAX_RETRIES};
use crate::entity::{EntityKind, GuardCondition, WaitEntity};
use crate::error::Result;
use crate::waitable::Waitable;
use crate::waitset::{WaitSet, WaitSetCapacity};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct Executor {
    waitables: Mutex<Vec<Arc<dyn Waitable>>>,
    interrupt: Arc<GuardCondition>,
    shutdown: AtomicBool,
    options: ExecutorOptions,
}

impl Default for Executor {
    fn default() -> Self {
        Self::with_options(ExecutorOptions::default())
    }
}

impl Executor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ExecutorOptions) -> Self {
        Self {
            waitables: Mutex::new(Vec::new()),
            interrupt: Arc::new(GuardCondition::new()),
            shutdown: AtomicBool::new(false),
            options,
        }
    }

    /// Register a waitable. A blocked cycle is woken so it picks it up.
    pub fn add_waitable(&self, waitable: Arc<dyn Waitable>) {
        self.waitables.lock().push(waitable);
        self.wake();
    }

    /// Unregister a waitable by identity.
    pub fn remove_waitable(&self, waitable: &Arc<dyn Waitable>) -> bool {
        let removed = {
            let mut waitables = self.waitables.lock();
            let before = waitables.len();
            waitables.retain(|w| !Arc::ptr_eq(w, waitable));
            waitables.len() != before
        };
        if removed {
            self.wake();
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waitables.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waitables.lock().is_empty()
    }

    /// Interrupt the current (or next) wait.
    pub fn wake(&self) {
        self.interrupt.trigger();
    }

    /// Stop [`spin`](Self::spin) after the current cycle.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake();
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Run one add -> wait -> update -> execute cycle.
    ///
    /// Returns how many waitables executed. Every ready waitable runs even
    /// when an earlier one fails; the first failure is returned. Not
    /// reentrant: a concurrent call on the same executor fails with
    /// `AlreadyRegistered`.
    pub fn spin_once(&self, timeout: Option<Duration>) -> Result<usize> {
        let waitables = self.waitables.lock().clone();
        let capacity =
            WaitSetCapacity::for_waitables(&waitables).with(EntityKind::GuardCondition, 1);

        let mut wait_set = WaitSet::new(capacity);
        wait_set.add(self.interrupt.clone())?;
        for waitable in waitables {
            wait_set.add_waitable(waitable)?;
        }

        let timeout = match (timeout, self.options.wait_timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let result = wait_set.wait(timeout)?;
        if result.contains(self.interrupt.entity_id()) {
            self.interrupt.take();
        }

        for waitable in wait_set.waitables() {
            waitable.update(&wait_set);
        }

        let mut executed = 0;
        let mut first_error = None;
        for waitable in wait_set.waitables().iter().filter(|w| w.is_ready()) {
            executed += 1;
            if let Err(e) = waitable.execute() {
                log::error!("[executor] waitable failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        log::trace!("[executor] cycle executed={}", executed);
        first_error.map_or(Ok(executed), Err)
    }

    /// Cycle until [`shutdown`](Self::shutdown). Execution failures are
    /// logged and do not stop the loop.
    ///
    /// Waitset build failures (`CapacityExceeded`, `AlreadyRegistered`) are
    /// retried with exponential backoff: 10ms, 20ms, 40ms, ... After
    /// [`SPIN_MAX_RETRIES`] consecutive failures the error is returned.
    pub fn spin(&self) -> Result<()> {
        let initial_backoff = Duration::from_millis(SPIN_INITIAL_BACKOFF_MS);
        let mut backoff = initial_backoff;
        let mut retries: u8 = 0;

        while !self.is_shutdown() {
            match self.spin_once(None) {
                Ok(_) => {
                    retries = 0;
                    backoff = initial_backoff;
                }
                Err(e) if e.is_recoverable() => {
                    retries += 1;
                    if retries > SPIN_MAX_RETRIES {
                        log::error!(
                            "[executor] giving up after {} retries: {}",
                            SPIN_MAX_RETRIES,
                            e
                        );
                        return Err(e);
                    }
                    log::warn!(
                        "[executor] rebuilding in {:?} (retry {}/{}): {}",
                        backoff,
                        retries,
                        SPIN_MAX_RETRIES,
                        e
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(e) => {
                    retries = 0;
                    backoff = initial_backoff;
                    log::debug!("[executor] cycle error: {}", e);
                }
            }
        }
        log::debug!("[executor] shutdown");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityHandle;
    use crate::error::Error;
    use crate::waitable::EntityWaitable;
    use std::sync::atomic::AtomicUsize;

    fn counter_waitable(handle: &Arc<EntityHandle>, hits: &Arc<AtomicUsize>) -> Arc<dyn Waitable> {
        let hits = hits.clone();
        Arc::new(
            EntityWaitable::subscription(handle.clone(), move || {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .expect("subscription"),
        )
    }

    #[test]
    fn spin_once_executes_ready_waitables() {
        let executor = Executor::new();
        let handle = Arc::new(EntityHandle::subscription());
        let hits = Arc::new(AtomicUsize::new(0));
        executor.add_waitable(counter_waitable(&handle, &hits));

        // The add itself woke the interrupt guard.
        assert_eq!(executor.spin_once(Some(Duration::ZERO)).expect("cycle"), 0);

        handle.mark_ready();
        assert_eq!(executor.spin_once(Some(Duration::from_millis(100))).expect("cycle"), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn spin_once_times_out_idle() {
        let executor = Executor::new();
        assert_eq!(executor.spin_once(Some(Duration::from_millis(10))).expect("cycle"), 0);
    }

    #[test]
    fn failing_waitable_does_not_starve_others() {
        let executor = Executor::new();
        let bad = Arc::new(EntityHandle::subscription());
        let good = Arc::new(EntityHandle::subscription());
        let hits = Arc::new(AtomicUsize::new(0));

        executor.add_waitable(Arc::new(
            EntityWaitable::subscription(bad.clone(), || {
                Err(Error::InvalidArgument("bad".to_string()))
            })
            .expect("subscription"),
        ));
        executor.add_waitable(counter_waitable(&good, &hits));

        bad.mark_ready();
        good.mark_ready();
        let err = executor
            .spin_once(Some(Duration::from_millis(100)))
            .expect_err("first error surfaces");
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_waitable_by_identity() {
        let executor = Executor::new();
        let handle = Arc::new(EntityHandle::subscription());
        let hits = Arc::new(AtomicUsize::new(0));
        let waitable = counter_waitable(&handle, &hits);

        executor.add_waitable(waitable.clone());
        assert_eq!(executor.len(), 1);
        assert!(executor.remove_waitable(&waitable));
        assert!(!executor.remove_waitable(&waitable));
        assert!(executor.is_empty());
    }

    #[test]
    fn shutdown_stops_spin_from_other_thread() {
        let executor = Arc::new(Executor::new());
        let spinner = {
            let executor = executor.clone();
            thread::spawn(move || executor.spin())
        };

        thread::sleep(Duration::from_millis(20));
        executor.shutdown();
        spinner
            .join()
            .expect("spinner thread")
            .expect("spin returns cleanly");
        assert!(executor.is_shutdown());
    }

    #[test]
    fn spin_gives_up_on_persistent_registration_failure() {
        let guard = Arc::new(GuardCondition::new());
        let capacity = WaitSetCapacity::new().with(EntityKind::GuardCondition, 1);
        let mut foreign = WaitSet::new(capacity);
        foreign.add(guard.clone()).expect("held by another waitset");

        let executor = Executor::new();
        executor.add_waitable(Arc::new(EntityWaitable::guard_condition(guard, || Ok(()))));

        let start = std::time::Instant::now();
        let err = executor.spin().expect_err("registration keeps failing");
        assert!(matches!(
            err,
            Error::AlreadyRegistered { wait_set_id, .. } if wait_set_id == foreign.id()
        ));

        // Backoff sum for the allowed retries: 10 + 20 + 40 + 80 + 160 ms.
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(!executor.is_shutdown());
    }

    #[test]
    fn options_cap_the_wait() {
        let executor = Executor::with_options(ExecutorOptions {
            wait_timeout: Some(Duration::from_millis(5)),
        });
        let start = std::time::Instant::now();
        executor.spin_once(None).expect("cycle");
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
