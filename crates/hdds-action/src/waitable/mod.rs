// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Waitable - composable unit of "something that can become ready".
//!
//! One wait cycle drives every waitable through the same four steps:
//!
//! 1. size the waitset from the `get_number_of_ready_*` counts
//! 2. [`add_to_wait_set`](Waitable::add_to_wait_set)
//! 3. [`WaitSet::wait`], then [`update`](Waitable::update)
//! 4. [`execute`](Waitable::execute) for those reporting [`is_ready`](Waitable::is_ready)
//!
//! Calling the steps out of order is a contract violation and is not
//! checked at runtime. Waitables are shared as `Arc<dyn Waitable>` and use
//! interior mutability for their readiness bookkeeping.

mod composite;
mod entity;

pub use composite::CompositeWaitable;
pub use entity::{EntityCallback, EntityWaitable};

use crate::error::Result;
use crate::waitset::WaitSet;

/// Capability set shared by every dispatchable entity.
pub trait Waitable: Send + Sync {
    fn get_number_of_ready_subscriptions(&self) -> usize {
        0
    }

    fn get_number_of_ready_timers(&self) -> usize {
        0
    }

    fn get_number_of_ready_clients(&self) -> usize {
        0
    }

    fn get_number_of_ready_services(&self) -> usize {
        0
    }

    fn get_number_of_ready_guard_conditions(&self) -> usize {
        0
    }

    /// Register the constituent primitives. Must match the counts above.
    fn add_to_wait_set(&self, wait_set: &mut WaitSet) -> Result<()>;

    /// Capture readiness from the waitset that just returned from `wait`.
    fn update(&self, wait_set: &WaitSet);

    /// Readiness captured by the last `update`.
    fn is_ready(&self) -> bool;

    /// Run the work implied by the last `update`.
    fn execute(&self) -> Result<()>;
}
