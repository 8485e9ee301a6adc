// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{next_entity_id, EntityId, EntityKind, Membership, WaitEntity};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Deadline-driven primitive.
///
/// A periodic timer re-arms itself on [`take`](WaitEntity::take), skipping
/// any periods it missed. A one-shot timer disarms itself instead and stays
/// idle until [`reset`](Timer::reset) or [`reset_at`](Timer::reset_at).
#[derive(Debug)]
pub struct Timer {
    id: EntityId,
    interval: Duration,
    repeat: bool,
    deadline: Mutex<Option<Instant>>,
    membership: Membership,
}

impl Timer {
    fn build(interval: Duration, repeat: bool, deadline: Option<Instant>) -> Self {
        Self {
            id: next_entity_id(),
            interval,
            repeat,
            deadline: Mutex::new(deadline),
            membership: Membership::new(),
        }
    }

    /// Timer firing every `period`, first after one full period.
    pub fn periodic(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::InvalidArgument(
                "timer period must be > 0".to_string(),
            ));
        }
        Ok(Self::build(period, true, Instant::now().checked_add(period)))
    }

    /// Timer firing once after `delay`. A delay past the clock's range
    /// leaves the timer disarmed.
    #[must_use]
    pub fn one_shot(delay: Duration) -> Self {
        Self::build(delay, false, Instant::now().checked_add(delay))
    }

    /// One-shot timer created disarmed; arm it with [`reset_at`](Self::reset_at).
    #[must_use]
    pub fn disarmed() -> Self {
        Self::build(Duration::ZERO, false, None)
    }

    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.repeat
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Re-arm one interval from now, or disarm if that is out of range.
    pub fn reset(&self) {
        match Instant::now().checked_add(self.interval) {
            Some(deadline) => self.reset_at(deadline),
            None => self.cancel(),
        }
    }

    /// Re-arm at an explicit instant.
    pub fn reset_at(&self, deadline: Instant) {
        *self.deadline.lock() = Some(deadline);
        self.membership.notify();
    }

    /// Arm at `deadline` unless already armed for an earlier instant.
    pub fn reset_at_earliest(&self, deadline: Instant) {
        {
            let mut slot = self.deadline.lock();
            if slot.is_some_and(|current| current <= deadline) {
                return;
            }
            *slot = Some(deadline);
        }
        self.membership.notify();
    }

    /// Disarm until the next reset.
    pub fn cancel(&self) {
        *self.deadline.lock() = None;
        self.membership.notify();
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.deadline.lock().is_none()
    }

    /// Time left before the timer is ready; zero when overdue, `None` when disarmed.
    #[must_use]
    pub fn time_until_trigger(&self) -> Option<Duration> {
        let deadline = (*self.deadline.lock())?;
        Some(deadline.saturating_duration_since(Instant::now()))
    }

    fn next_after(&self, deadline: Instant, now: Instant) -> Option<Instant> {
        let interval_ns = self.interval.as_nanos().max(1);
        let behind_ns = now.saturating_duration_since(deadline).as_nanos();
        let periods = behind_ns / interval_ns + 1;
        let advance = u64::try_from(interval_ns.saturating_mul(periods)).ok()?;
        deadline.checked_add(Duration::from_nanos(advance))
    }
}

impl WaitEntity for Timer {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Timer
    }

    fn is_ready(&self) -> bool {
        self.deadline
            .lock()
            .is_some_and(|deadline| deadline <= Instant::now())
    }

    fn take(&self) -> bool {
        let mut slot = self.deadline.lock();
        let now = Instant::now();
        match *slot {
            Some(deadline) if deadline <= now => {
                *slot = if self.repeat {
                    self.next_after(deadline, now)
                } else {
                    None
                };
                true
            }
            _ => false,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        *self.deadline.lock()
    }

    fn membership(&self) -> &Membership {
        &self.membership
    }
}
