// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pollable primitives registered into a [`WaitSet`](crate::waitset::WaitSet).
//!
//! A transport hands out one primitive per subscription, client and service
//! endpoint ([`EntityHandle`]); timers ([`Timer`]) and guard conditions
//! ([`GuardCondition`]) are owned by the client layer itself. Each primitive
//! belongs to at most one live waitset at a time and signals that waitset's
//! driver when it becomes ready.

mod guard;
mod handle;
mod timer;

pub use guard::GuardCondition;
pub use handle::EntityHandle;
pub use timer::Timer;

use crate::error::{Error, Result};
use crate::rt::WaitDriver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Process-unique identifier of a primitive.
pub type EntityId = u64;

/// Primitive classes a waitset partitions its slots into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Subscription,
    Timer,
    Client,
    Service,
    GuardCondition,
}

impl EntityKind {
    pub const COUNT: usize = 5;

    pub const ALL: [EntityKind; Self::COUNT] = [
        EntityKind::Subscription,
        EntityKind::Timer,
        EntityKind::Client,
        EntityKind::Service,
        EntityKind::GuardCondition,
    ];

    /// Position of this kind in per-kind arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            EntityKind::Subscription => 0,
            EntityKind::Timer => 1,
            EntityKind::Client => 2,
            EntityKind::Service => 3,
            EntityKind::GuardCondition => 4,
        }
    }
}

pub(crate) fn next_entity_id() -> EntityId {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Records the single live waitset an entity belongs to.
///
/// `owner == 0` means unregistered. The driver link is weak so an entity
/// never keeps a dropped waitset's driver alive.
#[derive(Debug, Default)]
pub struct Membership {
    owner: AtomicU64,
    driver: Mutex<Weak<WaitDriver>>,
}

impl Membership {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the waitset currently holding this entity.
    #[must_use]
    pub fn owner(&self) -> Option<u64> {
        match self.owner.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }

    pub(crate) fn join(
        &self,
        entity_id: EntityId,
        wait_set_id: u64,
        driver: &Arc<WaitDriver>,
    ) -> Result<()> {
        let mut link = self.driver.lock();
        match self
            .owner
            .compare_exchange(0, wait_set_id, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                *link = Arc::downgrade(driver);
                Ok(())
            }
            Err(current) => Err(Error::AlreadyRegistered {
                entity_id,
                wait_set_id: current,
            }),
        }
    }

    pub(crate) fn leave(&self, wait_set_id: u64) -> bool {
        let mut link = self.driver.lock();
        let released = self
            .owner
            .compare_exchange(wait_set_id, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if released {
            *link = Weak::new();
        }
        released
    }

    /// Wake the owning waitset, if any.
    pub fn notify(&self) {
        let driver = self.driver.lock().upgrade();
        if let Some(driver) = driver {
            driver.notify();
        }
    }
}

/// A primitive that can be registered into a waitset and polled.
pub trait WaitEntity: Send + Sync {
    /// Stable identifier of this primitive.
    fn entity_id(&self) -> EntityId;

    /// Which waitset partition the primitive occupies.
    fn kind(&self) -> EntityKind;

    /// Whether work is pending right now. Must not consume anything.
    fn is_ready(&self) -> bool;

    /// Consume one unit of readiness. Returns `false` if nothing was pending.
    fn take(&self) -> bool;

    /// Instant at which the primitive becomes ready on its own (timers).
    fn next_deadline(&self) -> Option<Instant> {
        None
    }

    /// Waitset membership cell.
    fn membership(&self) -> &Membership;
}

#[cfg(test)]
mod tests;
