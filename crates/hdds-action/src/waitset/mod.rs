// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitSet - one blocking wait across heterogeneous primitives.
//!
//! A waitset is sized once, filled for one wait cycle and then dropped; the
//! executor rebuilds it when membership changes. Slots are partitioned by
//! [`EntityKind`] and each partition has a fixed capacity. Every registered
//! primitive signals the waitset's [`WaitDriver`] when it becomes ready, so
//! a guard condition triggered from another thread interrupts a blocked
//! wait even when no data is pending.

use crate::entity::{EntityId, EntityKind, WaitEntity};
use crate::error::{Error, Result};
use crate::rt::WaitDriver;
use crate::waitable::Waitable;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-kind slot limits negotiated when the waitset is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitSetCapacity {
    pub subscriptions: usize,
    pub timers: usize,
    pub clients: usize,
    pub services: usize,
    pub guard_conditions: usize,
}

impl WaitSetCapacity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum the readiness counts of every waitable.
    pub fn for_waitables<'a, I>(waitables: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<dyn Waitable>>,
    {
        let mut capacity = Self::default();
        for waitable in waitables {
            capacity.add_waitable(waitable.as_ref());
        }
        capacity
    }

    pub fn add_waitable(&mut self, waitable: &dyn Waitable) {
        self.subscriptions += waitable.get_number_of_ready_subscriptions();
        self.timers += waitable.get_number_of_ready_timers();
        self.clients += waitable.get_number_of_ready_clients();
        self.services += waitable.get_number_of_ready_services();
        self.guard_conditions += waitable.get_number_of_ready_guard_conditions();
    }

    /// Reserve `count` more slots of `kind`.
    #[must_use]
    pub fn with(mut self, kind: EntityKind, count: usize) -> Self {
        *self.slot_mut(kind) += count;
        self
    }

    #[must_use]
    pub fn get(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Subscription => self.subscriptions,
            EntityKind::Timer => self.timers,
            EntityKind::Client => self.clients,
            EntityKind::Service => self.services,
            EntityKind::GuardCondition => self.guard_conditions,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }

    fn slot_mut(&mut self, kind: EntityKind) -> &mut usize {
        match kind {
            EntityKind::Subscription => &mut self.subscriptions,
            EntityKind::Timer => &mut self.timers,
            EntityKind::Client => &mut self.clients,
            EntityKind::Service => &mut self.services,
            EntityKind::GuardCondition => &mut self.guard_conditions,
        }
    }
}

/// Ready entities reported by one [`WaitSet::wait`], partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitResult {
    ready: [Vec<EntityId>; EntityKind::COUNT],
    timed_out: bool,
}

impl WaitResult {
    #[must_use]
    pub fn of_kind(&self, kind: EntityKind) -> &[EntityId] {
        &self.ready[kind.index()]
    }

    #[must_use]
    pub fn subscriptions(&self) -> &[EntityId] {
        self.of_kind(EntityKind::Subscription)
    }

    #[must_use]
    pub fn timers(&self) -> &[EntityId] {
        self.of_kind(EntityKind::Timer)
    }

    #[must_use]
    pub fn clients(&self) -> &[EntityId] {
        self.of_kind(EntityKind::Client)
    }

    #[must_use]
    pub fn services(&self) -> &[EntityId] {
        self.of_kind(EntityKind::Service)
    }

    #[must_use]
    pub fn guard_conditions(&self) -> &[EntityId] {
        self.of_kind(EntityKind::GuardCondition)
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.ready.iter().any(|ids| ids.contains(&id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ready.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the wait ended because the timeout elapsed.
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

struct Slot {
    entity: Arc<dyn WaitEntity>,
    ready: bool,
}

/// WaitSet - fixed-capacity collection of primitives plus the waitables
/// that registered them.
pub struct WaitSet {
    id: u64,
    capacity: WaitSetCapacity,
    driver: Arc<WaitDriver>,
    slots: [Vec<Slot>; EntityKind::COUNT],
    index: HashMap<EntityId, (EntityKind, usize)>,
    waitables: Vec<Arc<dyn Waitable>>,
}

impl WaitSet {
    #[must_use]
    pub fn new(capacity: WaitSetCapacity) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            driver: Arc::new(WaitDriver::new()),
            slots: std::array::from_fn(|kind| {
                Vec::with_capacity(capacity.get(EntityKind::ALL[kind]))
            }),
            index: HashMap::with_capacity(capacity.total()),
            waitables: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn capacity(&self) -> WaitSetCapacity {
        self.capacity
    }

    /// Number of registered primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Register one primitive.
    ///
    /// Fails with `CapacityExceeded` when its partition is full and with
    /// `AlreadyRegistered` when it is already part of a live waitset
    /// (including this one).
    pub fn add(&mut self, entity: Arc<dyn WaitEntity>) -> Result<()> {
        let kind = entity.kind();
        let entity_id = entity.entity_id();

        if self.index.contains_key(&entity_id) {
            return Err(Error::AlreadyRegistered {
                entity_id,
                wait_set_id: self.id,
            });
        }

        let limit = self.capacity.get(kind);
        let partition = &mut self.slots[kind.index()];
        if partition.len() >= limit {
            return Err(Error::CapacityExceeded {
                kind,
                capacity: limit,
            });
        }

        entity.membership().join(entity_id, self.id, &self.driver)?;

        self.index.insert(entity_id, (kind, partition.len()));
        partition.push(Slot {
            entity,
            ready: false,
        });
        Ok(())
    }

    /// Register a waitable's primitives and keep the waitable for dispatch.
    pub fn add_waitable(&mut self, waitable: Arc<dyn Waitable>) -> Result<()> {
        waitable.add_to_wait_set(self)?;
        self.waitables.push(waitable);
        Ok(())
    }

    /// Waitables added through [`add_waitable`](Self::add_waitable).
    #[must_use]
    pub fn waitables(&self) -> &[Arc<dyn Waitable>] {
        &self.waitables
    }

    /// Whether `id` was reported ready by the last wait.
    #[must_use]
    pub fn is_ready(&self, id: EntityId) -> bool {
        self.index
            .get(&id)
            .is_some_and(|(kind, pos)| self.slots[kind.index()][*pos].ready)
    }

    /// Block until at least one primitive is ready or `timeout` elapses.
    ///
    /// `None` blocks indefinitely; `Some(Duration::ZERO)` polls once. Timers
    /// shorten the block to their nearest deadline. A timeout is reported
    /// through [`WaitResult::timed_out`], not as an error.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<WaitResult> {
        if self.is_empty() && timeout.is_none() {
            return Err(Error::InvalidArgument(
                "cannot block on an empty waitset without a timeout".to_string(),
            ));
        }

        log::debug!(
            "[waitset] id={} wait entities={} timeout={:?}",
            self.id,
            self.len(),
            timeout
        );

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        loop {
            let epoch = self.driver.epoch();
            if self.poll() {
                let result = self.collect(false);
                log::debug!("[waitset] id={} ready={}", self.id, result.len());
                return Ok(result);
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(self.collect(true));
            }

            let wake_at = match (deadline, self.next_timer_deadline()) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            self.driver.wait_until(epoch, wake_at);
        }
    }

    fn poll(&mut self) -> bool {
        let mut any = false;
        for slot in self.slots.iter_mut().flatten() {
            slot.ready = slot.entity.is_ready();
            any |= slot.ready;
        }
        any
    }

    fn next_timer_deadline(&self) -> Option<Instant> {
        self.slots[EntityKind::Timer.index()]
            .iter()
            .filter_map(|slot| slot.entity.next_deadline())
            .min()
    }

    fn collect(&self, timed_out: bool) -> WaitResult {
        let ready = std::array::from_fn(|kind| {
            self.slots[kind]
                .iter()
                .filter(|slot| slot.ready)
                .map(|slot| slot.entity.entity_id())
                .collect()
        });
        WaitResult { ready, timed_out }
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        for slot in self.slots.iter().flatten() {
            slot.entity.membership().leave(self.id);
        }
    }
}

impl std::fmt::Debug for WaitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSet")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("entities", &self.index.len())
            .field("waitables", &self.waitables.len())
            .finish()
    }
}
