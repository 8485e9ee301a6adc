// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{next_entity_id, EntityId, EntityKind, Membership, WaitEntity};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pollable handle for a subscription, client or service endpoint.
///
/// The transport bumps the pending count when a message, reply or request
/// arrives and takes one unit each time it hands the data out.
#[derive(Debug)]
pub struct EntityHandle {
    id: EntityId,
    kind: EntityKind,
    pending: AtomicUsize,
    membership: Membership,
}

impl EntityHandle {
    fn with_kind(kind: EntityKind) -> Self {
        Self {
            id: next_entity_id(),
            kind,
            pending: AtomicUsize::new(0),
            membership: Membership::new(),
        }
    }

    #[must_use]
    pub fn subscription() -> Self {
        Self::with_kind(EntityKind::Subscription)
    }

    #[must_use]
    pub fn client() -> Self {
        Self::with_kind(EntityKind::Client)
    }

    #[must_use]
    pub fn service() -> Self {
        Self::with_kind(EntityKind::Service)
    }

    /// Record one unit of pending work and wake the owning waitset.
    pub fn mark_ready(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.membership.notify();
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl WaitEntity for EntityHandle {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn is_ready(&self) -> bool {
        self.pending() > 0
    }

    fn take(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    fn membership(&self) -> &Membership {
        &self.membership
    }
}
