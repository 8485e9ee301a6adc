// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::Waitable;
use crate::error::Result;
use crate::waitset::WaitSet;
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered group of child waitables dispatched as one.
///
/// Counts are the sums of the children's counts. Children may themselves
/// be composites.
#[derive(Default)]
pub struct CompositeWaitable {
    children: RwLock<Vec<Arc<dyn Waitable>>>,
}

impl CompositeWaitable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child. Takes effect from the next cycle.
    pub fn push(&self, child: Arc<dyn Waitable>) {
        self.children.write().push(child);
    }

    /// Remove a child by identity. Returns whether it was present.
    pub fn remove(&self, child: &Arc<dyn Waitable>) -> bool {
        let mut children = self.children.write();
        let before = children.len();
        children.retain(|c| !Arc::ptr_eq(c, child));
        children.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }

    fn sum(&self, count: impl Fn(&dyn Waitable) -> usize) -> usize {
        self.children.read().iter().map(|c| count(c.as_ref())).sum()
    }
}

impl Waitable for CompositeWaitable {
    fn get_number_of_ready_subscriptions(&self) -> usize {
        self.sum(|c| c.get_number_of_ready_subscriptions())
    }

    fn get_number_of_ready_timers(&self) -> usize {
        self.sum(|c| c.get_number_of_ready_timers())
    }

    fn get_number_of_ready_clients(&self) -> usize {
        self.sum(|c| c.get_number_of_ready_clients())
    }

    fn get_number_of_ready_services(&self) -> usize {
        self.sum(|c| c.get_number_of_ready_services())
    }

    fn get_number_of_ready_guard_conditions(&self) -> usize {
        self.sum(|c| c.get_number_of_ready_guard_conditions())
    }

    fn add_to_wait_set(&self, wait_set: &mut WaitSet) -> Result<()> {
        for child in self.children.read().iter() {
            child.add_to_wait_set(wait_set)?;
        }
        Ok(())
    }

    fn update(&self, wait_set: &WaitSet) {
        for child in self.children.read().iter() {
            child.update(wait_set);
        }
    }

    fn is_ready(&self) -> bool {
        self.children.read().iter().any(|c| c.is_ready())
    }

    fn execute(&self) -> Result<()> {
        // Snapshot so a child callback may push/remove siblings.
        let children: Vec<_> = self.children.read().clone();
        let mut first_error = None;
        for child in children.iter().filter(|c| c.is_ready()) {
            if let Err(e) = child.execute() {
                log::error!("[waitable] composite child failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for CompositeWaitable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeWaitable")
            .field("children", &self.len())
            .finish()
    }
}
