// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::Waitable;
use crate::entity::{EntityHandle, EntityKind, GuardCondition, Timer, WaitEntity};
use crate::error::{Error, Result};
use crate::waitset::WaitSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Work run when an [`EntityWaitable`] consumed one unit of readiness.
pub type EntityCallback = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Single-primitive waitable: subscription, timer, client, service or
/// guard condition paired with the callback that services it.
pub struct EntityWaitable {
    entity: Arc<dyn WaitEntity>,
    callback: EntityCallback,
    ready: AtomicBool,
}

impl EntityWaitable {
    pub fn new<F>(entity: Arc<dyn WaitEntity>, callback: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            entity,
            callback: Box::new(callback),
            ready: AtomicBool::new(false),
        }
    }

    fn checked<F>(handle: Arc<EntityHandle>, expected: EntityKind, callback: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let kind = handle.kind();
        if kind != expected {
            return Err(Error::InvalidArgument(format!(
                "expected a {expected:?} handle, got {kind:?}"
            )));
        }
        Ok(Self::new(handle, callback))
    }

    pub fn subscription<F>(handle: Arc<EntityHandle>, callback: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::checked(handle, EntityKind::Subscription, callback)
    }

    pub fn client<F>(handle: Arc<EntityHandle>, callback: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::checked(handle, EntityKind::Client, callback)
    }

    pub fn service<F>(handle: Arc<EntityHandle>, callback: F) -> Result<Self>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::checked(handle, EntityKind::Service, callback)
    }

    pub fn timer<F>(timer: Arc<Timer>, callback: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::new(timer, callback)
    }

    pub fn guard_condition<F>(guard: Arc<GuardCondition>, callback: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::new(guard, callback)
    }

    #[must_use]
    pub fn entity(&self) -> &Arc<dyn WaitEntity> {
        &self.entity
    }

    fn count_for(&self, kind: EntityKind) -> usize {
        usize::from(self.entity.kind() == kind)
    }
}

impl Waitable for EntityWaitable {
    fn get_number_of_ready_subscriptions(&self) -> usize {
        self.count_for(EntityKind::Subscription)
    }

    fn get_number_of_ready_timers(&self) -> usize {
        self.count_for(EntityKind::Timer)
    }

    fn get_number_of_ready_clients(&self) -> usize {
        self.count_for(EntityKind::Client)
    }

    fn get_number_of_ready_services(&self) -> usize {
        self.count_for(EntityKind::Service)
    }

    fn get_number_of_ready_guard_conditions(&self) -> usize {
        self.count_for(EntityKind::GuardCondition)
    }

    fn add_to_wait_set(&self, wait_set: &mut WaitSet) -> Result<()> {
        wait_set.add(self.entity.clone())
    }

    fn update(&self, wait_set: &WaitSet) {
        self.ready
            .store(wait_set.is_ready(self.entity.entity_id()), Ordering::Release);
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn execute(&self) -> Result<()> {
        self.ready.store(false, Ordering::Release);
        if !self.entity.take() {
            return Ok(());
        }
        (self.callback)()
    }
}

impl std::fmt::Debug for EntityWaitable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityWaitable")
            .field("entity_id", &self.entity.entity_id())
            .field("kind", &self.entity.kind())
            .field("ready", &self.is_ready())
            .finish()
    }
}
