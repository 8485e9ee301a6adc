// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{next_entity_id, EntityId, EntityKind, Membership, WaitEntity};
use std::sync::atomic::{AtomicBool, Ordering};

/// GuardCondition - application-triggered wake primitive.
///
/// Used to interrupt a blocked wait from another thread (shutdown, new
/// entities, cross-thread events) independently of data availability.
/// The trigger stays set until taken, so a trigger raised while no wait is
/// in progress is reported by the next one.
#[derive(Debug)]
pub struct GuardCondition {
    id: EntityId,
    triggered: AtomicBool,
    membership: Membership,
}

impl GuardCondition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_entity_id(),
            triggered: AtomicBool::new(false),
            membership: Membership::new(),
        }
    }

    /// Set the trigger and wake the owning waitset.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        self.membership.notify();
    }

    #[must_use]
    pub fn get_trigger_value(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitEntity for GuardCondition {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::GuardCondition
    }

    fn is_ready(&self) -> bool {
        self.get_trigger_value()
    }

    fn take(&self) -> bool {
        self.triggered.swap(false, Ordering::AcqRel)
    }

    fn membership(&self) -> &Membership {
        &self.membership
    }
}
