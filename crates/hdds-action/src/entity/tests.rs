// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use std::thread;
use std::time::Duration;

#[test]
fn kind_indices_are_dense() {
    for (expected, kind) in EntityKind::ALL.iter().enumerate() {
        assert_eq!(kind.index(), expected);
    }
}

#[test]
fn entity_ids_unique() {
    let a = EntityHandle::subscription();
    let b = EntityHandle::service();
    let guard = GuardCondition::new();
    let timer = Timer::disarmed();

    let mut ids = vec![a.entity_id(), b.entity_id(), guard.entity_id(), timer.entity_id()];
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[test]
fn handle_counts_pending_units() {
    let handle = EntityHandle::client();
    assert_eq!(handle.kind(), EntityKind::Client);
    assert!(!handle.is_ready());

    handle.mark_ready();
    handle.mark_ready();
    assert_eq!(handle.pending(), 2);
    assert!(handle.take());
    assert!(handle.is_ready());
    assert!(handle.take());
    assert!(!handle.take());
    assert_eq!(handle.pending(), 0);
}

#[test]
fn guard_trigger_is_sticky_until_taken() {
    let guard = GuardCondition::new();
    assert!(!guard.is_ready());

    guard.trigger();
    assert!(guard.is_ready());
    assert!(guard.is_ready());
    assert!(guard.take());
    assert!(!guard.get_trigger_value());
    assert!(!guard.take());
}

#[test]
fn membership_is_exclusive() {
    let driver_a = Arc::new(WaitDriver::new());
    let driver_b = Arc::new(WaitDriver::new());
    let guard = GuardCondition::new();

    guard
        .membership()
        .join(guard.entity_id(), 7, &driver_a)
        .expect("first join");
    let err = guard
        .membership()
        .join(guard.entity_id(), 8, &driver_b)
        .expect_err("second join must fail");
    assert!(matches!(
        err,
        Error::AlreadyRegistered { wait_set_id: 7, .. }
    ));

    assert!(!guard.membership().leave(8));
    assert!(guard.membership().leave(7));
    assert_eq!(guard.membership().owner(), None);
    guard
        .membership()
        .join(guard.entity_id(), 8, &driver_b)
        .expect("join after leave");
}

#[test]
fn trigger_signals_owning_driver() {
    let driver = Arc::new(WaitDriver::new());
    let guard = GuardCondition::new();
    guard
        .membership()
        .join(guard.entity_id(), 1, &driver)
        .expect("join");

    let before = driver.epoch();
    guard.trigger();
    assert_ne!(driver.epoch(), before);
}

#[test]
fn periodic_rejects_zero_period() {
    assert!(matches!(
        Timer::periodic(Duration::ZERO),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn one_shot_disarms_after_take() {
    let timer = Timer::one_shot(Duration::from_millis(5));
    assert!(!timer.is_ready());
    thread::sleep(Duration::from_millis(10));

    assert!(timer.is_ready());
    assert!(timer.take());
    assert!(timer.is_canceled());
    assert!(!timer.take());
    assert_eq!(timer.time_until_trigger(), None);
}

#[test]
fn periodic_skips_missed_periods() {
    let timer = Timer::periodic(Duration::from_millis(5)).expect("timer");
    thread::sleep(Duration::from_millis(23));

    assert!(timer.take());
    // Re-armed at most one period away, not once per missed period.
    let remaining = timer.time_until_trigger().expect("armed");
    assert!(remaining <= Duration::from_millis(5));
    assert!(!timer.is_canceled());
}

#[test]
fn disarmed_timer_arms_on_reset_at() {
    let timer = Timer::disarmed();
    assert!(timer.is_canceled());
    assert_eq!(timer.next_deadline(), None);

    timer.reset_at(Instant::now());
    assert!(timer.is_ready());
    timer.cancel();
    assert!(!timer.is_ready());
}

#[test]
fn reset_at_earliest_keeps_sooner_deadline() {
    let timer = Timer::disarmed();
    let soon = Instant::now() + Duration::from_secs(1);
    let later = soon + Duration::from_secs(1);

    timer.reset_at_earliest(later);
    assert_eq!(timer.next_deadline(), Some(later));
    timer.reset_at_earliest(soon);
    assert_eq!(timer.next_deadline(), Some(soon));
    timer.reset_at_earliest(later);
    assert_eq!(timer.next_deadline(), Some(soon));
}

#[test]
fn out_of_range_deadlines_leave_timer_disarmed() {
    let one_shot = Timer::one_shot(Duration::MAX);
    assert!(one_shot.is_canceled());
    assert!(!one_shot.is_ready());

    let periodic = Timer::periodic(Duration::MAX).expect("non-zero period");
    assert!(periodic.is_canceled());

    periodic.reset_at(Instant::now());
    periodic.reset();
    assert!(periodic.is_canceled());
}

#[test]
fn periodic_take_disarms_when_next_period_overflows() {
    let timer = Timer::periodic(Duration::from_secs(u64::MAX / 2)).expect("timer");
    timer.reset_at(Instant::now());
    assert!(timer.take());
    assert_eq!(timer.time_until_trigger(), None);
}
