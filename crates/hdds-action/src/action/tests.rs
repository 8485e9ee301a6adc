// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::goal_handle::GoalObserver;
use super::*;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

struct Fib;

impl ActionType for Fib {
    type Goal = u32;
    type Result = Vec<u64>;
    type Feedback = u64;

    fn type_name() -> &'static str {
        "test/action/Fib"
    }
}

#[derive(Default)]
struct Recorder {
    transitions: Mutex<Vec<GoalStatus>>,
    terminals: Mutex<Vec<(GoalStatus, Vec<RequestId>)>>,
    feedback: Mutex<Vec<u64>>,
}

impl GoalObserver<Fib> for Recorder {
    fn on_transition(&self, _goal_id: GoalId, status: GoalStatus) -> Result<()> {
        self.transitions.lock().push(status);
        Ok(())
    }

    fn on_terminal(&self, handle: &GoalHandle<Fib>, waiting: Vec<RequestId>) -> Result<()> {
        self.terminals.lock().push((handle.status(), waiting));
        Ok(())
    }

    fn on_feedback(&self, _goal_id: GoalId, feedback: u64) -> Result<()> {
        self.feedback.lock().push(feedback);
        Ok(())
    }
}

fn handle_with(recorder: &Arc<Recorder>) -> GoalHandle<Fib> {
    let recorder_weak = Arc::downgrade(recorder);
    let observer: Weak<dyn GoalObserver<Fib>> = recorder_weak;
    let info = GoalInfo {
        goal_id: GoalId::from_u128(42),
        stamp: SystemTime::now(),
    };
    GoalHandle::new(info, 5, observer)
}

#[test]
fn goal_id_displays_as_hex() {
    let id = GoalId::from_u128(0x0102);
    let text = id.to_string();
    assert_eq!(text.len(), 32);
    assert!(text.ends_with("0102"));
    assert_eq!(format!("{id:?}"), format!("GoalId({text})"));
}

#[test]
fn status_numbering_matches_action_msgs() {
    assert_eq!(GoalStatus::Unknown.as_i8(), 0);
    assert_eq!(GoalStatus::Canceling.as_i8(), 3);
    assert_eq!(GoalStatus::Aborted.as_i8(), 6);
    assert_eq!(GoalStatus::from_i8(5), Some(GoalStatus::Canceled));
    assert_eq!(GoalStatus::from_i8(7), None);
    assert!(GoalStatus::Succeeded.is_terminal());
    assert!(!GoalStatus::Canceling.is_terminal());
    assert_eq!(CancelReturnCode::GoalTerminated as i8, 3);
}

#[test]
fn cancel_request_targets() {
    let t0 = SystemTime::now();
    let early = GoalInfo {
        goal_id: GoalId::from_u128(1),
        stamp: t0,
    };
    let late = GoalInfo {
        goal_id: GoalId::from_u128(2),
        stamp: t0 + Duration::from_secs(10),
    };

    assert!(CancelRequest::all().matches(&early));
    assert!(CancelRequest::goal(late.goal_id).matches(&late));
    assert!(!CancelRequest::goal(late.goal_id).matches(&early));

    let by_time = CancelRequest::before(t0 + Duration::from_secs(1));
    assert!(by_time.matches(&early));
    assert!(!by_time.matches(&late));

    let union = CancelRequest {
        goal_id: Some(late.goal_id),
        before: Some(t0),
    };
    assert!(union.matches(&early));
    assert!(union.matches(&late));
}

#[test]
fn happy_path_notifies_observer() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);
    assert_eq!(handle.status(), GoalStatus::Accepted);
    assert_eq!(*handle.goal(), 5);

    handle.execute().expect("execute");
    handle.publish_feedback(1).expect("feedback");
    handle.succeed(vec![0, 1, 1, 2, 3]).expect("succeed");

    assert_eq!(*recorder.transitions.lock(), vec![GoalStatus::Executing]);
    assert_eq!(*recorder.feedback.lock(), vec![1]);
    assert_eq!(recorder.terminals.lock().len(), 1);
    assert_eq!(handle.result(), Some(vec![0, 1, 1, 2, 3]));
    assert!(handle.terminal_at().is_some());
}

#[test]
fn execute_only_from_accepted() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);
    handle.execute().expect("first");

    let err = handle.execute().expect_err("second execute");
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: GoalStatus::Executing,
            to: GoalStatus::Executing,
            ..
        }
    ));
}

#[test]
fn terminal_requires_execution() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);
    let err = handle.succeed(vec![]).expect_err("not executing yet");
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: GoalStatus::Accepted,
            to: GoalStatus::Succeeded,
            ..
        }
    ));
    assert_eq!(handle.status(), GoalStatus::Accepted);
}

#[test]
fn second_terminal_fails_and_keeps_state() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);
    handle.execute().expect("execute");
    handle.abort(vec![7]).expect("abort");

    let err = handle.succeed(vec![8]).expect_err("already terminal");
    assert!(matches!(
        err,
        Error::AlreadyTerminal {
            status: GoalStatus::Aborted,
            ..
        }
    ));
    assert_eq!(handle.status(), GoalStatus::Aborted);
    assert_eq!(handle.result(), Some(vec![7]));
    assert!(matches!(
        handle.publish_feedback(9),
        Err(Error::AlreadyTerminal { .. })
    ));
}

#[test]
fn cancel_is_idempotent_and_cooperative() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);

    assert!(handle.mark_canceling());
    assert!(handle.mark_canceling());
    assert_eq!(handle.status(), GoalStatus::Canceling);
    assert!(handle.is_cancel_requested());
    assert!(handle.is_active());

    handle.canceled(vec![]).expect("canceled");
    assert!(!handle.mark_canceling());
    assert_eq!(handle.status(), GoalStatus::Canceled);
    assert!(handle.is_cancel_requested());
}

#[test]
fn canceling_is_never_observed_without_cancel_flag() {
    for _ in 0..200 {
        let recorder = Arc::new(Recorder::default());
        let handle = Arc::new(handle_with(&recorder));
        handle.execute().expect("execute");

        let watcher = {
            let handle = handle.clone();
            std::thread::spawn(move || loop {
                if handle.is_canceling() {
                    return handle.is_cancel_requested();
                }
                std::hint::spin_loop();
            })
        };

        assert!(handle.mark_canceling());
        assert!(watcher.join().expect("watcher thread"));
    }
}

#[test]
fn result_requests_park_until_terminal() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);
    handle.execute().expect("execute");

    assert!(handle.result_or_enqueue(RequestId(1)).is_none());
    assert!(handle.result_or_enqueue(RequestId(2)).is_none());
    handle.succeed(vec![1]).expect("succeed");

    let terminals = recorder.terminals.lock();
    assert_eq!(terminals[0].0, GoalStatus::Succeeded);
    assert_eq!(terminals[0].1, vec![RequestId(1), RequestId(2)]);
    drop(terminals);

    let reply = handle.result_or_enqueue(RequestId(3)).expect("terminal reply");
    assert_eq!(reply.status, GoalStatus::Succeeded);
    assert_eq!(reply.result, Some(vec![1]));
}

#[test]
fn handle_outlives_observer() {
    let recorder = Arc::new(Recorder::default());
    let handle = handle_with(&recorder);
    drop(recorder);

    handle.execute().expect("execute without observer");
    handle.publish_feedback(3).expect("feedback dropped silently");
    handle.succeed(vec![]).expect("succeed without observer");
}

fn accept_all_server(transport: &Arc<IntraProcessTransport<Fib>>) -> ActionServer<Fib> {
    ActionServer::<Fib>::builder("fib")
        .on_goal(|_, order| {
            if *order > 0 {
                GoalResponse::Accept
            } else {
                GoalResponse::Reject
            }
        })
        .on_cancel(|_| CancelResponse::Accept)
        .on_accepted(|_| {})
        .build(transport.clone())
        .expect("server")
}

#[test]
fn builder_requires_callbacks() {
    let transport = Arc::new(IntraProcessTransport::<Fib>::new());
    let err = ActionServer::<Fib>::builder("fib")
        .on_goal(|_, _| GoalResponse::Accept)
        .build(transport)
        .expect_err("missing callbacks");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn rejected_goal_creates_no_handle() {
    let transport = Arc::new(IntraProcessTransport::<Fib>::new());
    let server = accept_all_server(&transport);
    let goal_id = GoalId::from_u128(9);

    server
        .handle_goal_request(RequestId(1), GoalRequest { goal_id, goal: 0 })
        .expect("dispatch");

    assert!(!transport.goal_reply(RequestId(1)).expect("reply").accepted);
    assert!(server.goal_handle(goal_id).is_none());
    assert!(transport.status_history().is_empty());
}

#[test]
fn cancel_return_codes() {
    let transport = Arc::new(IntraProcessTransport::<Fib>::new());
    let server = ActionServer::<Fib>::builder("fib")
        .on_goal(|_, _| GoalResponse::Accept)
        .on_cancel(|_| CancelResponse::Reject)
        .on_accepted(|_| {})
        .build(transport.clone())
        .expect("server");

    let unknown = server.process_cancel(&CancelRequest::goal(GoalId::from_u128(77)));
    assert_eq!(unknown.return_code, CancelReturnCode::UnknownGoalId);

    let goal_id = GoalId::from_u128(1);
    server
        .handle_goal_request(RequestId(1), GoalRequest { goal_id, goal: 3 })
        .expect("accept");
    let rejected = server.process_cancel(&CancelRequest::goal(goal_id));
    assert_eq!(rejected.return_code, CancelReturnCode::Rejected);
    assert!(rejected.goals_canceling.is_empty());

    let handle = server.goal_handle(goal_id).expect("handle");
    handle.execute().expect("execute");
    handle.abort(vec![]).expect("abort");
    let terminated = server.process_cancel(&CancelRequest::goal(goal_id));
    assert_eq!(terminated.return_code, CancelReturnCode::GoalTerminated);

    let empty = server.process_cancel(&CancelRequest::all());
    assert_eq!(empty.return_code, CancelReturnCode::Rejected);
}

#[test]
fn cancel_dispatch_publishes_once_per_batch() {
    let transport = Arc::new(IntraProcessTransport::<Fib>::new());
    let server = accept_all_server(&transport);
    let ids = [GoalId::from_u128(1), GoalId::from_u128(2)];
    for (n, goal_id) in ids.into_iter().enumerate() {
        server
            .handle_goal_request(RequestId(n as u64), GoalRequest { goal_id, goal: 1 })
            .expect("accept");
    }
    let published_before = transport.status_history().len();

    server
        .handle_cancel_request(RequestId(10), CancelRequest::all())
        .expect("cancel");

    let reply = transport.cancel_reply(RequestId(10)).expect("reply");
    assert_eq!(reply.goals_canceling.len(), 2);
    assert_eq!(transport.status_history().len(), published_before + 1);
    let latest = transport.latest_status().expect("status");
    for goal_id in ids {
        assert_eq!(latest.status_of(goal_id), Some(GoalStatus::Canceling));
    }

    // Nothing newly canceling: reply only, no publication.
    server
        .handle_cancel_request(RequestId(11), CancelRequest::goal(GoalId::from_u128(99)))
        .expect("cancel unknown");
    assert_eq!(transport.status_history().len(), published_before + 1);
}

#[test]
fn status_array_is_ordered_by_stamp() {
    let transport = Arc::new(IntraProcessTransport::<Fib>::new());
    let server = accept_all_server(&transport);
    let ids: Vec<GoalId> = (1..=3).map(GoalId::from_u128).collect();

    for (n, goal_id) in ids.iter().rev().enumerate() {
        server
            .handle_goal_request(
                RequestId(n as u64),
                GoalRequest {
                    goal_id: *goal_id,
                    goal: 1,
                },
            )
            .expect("accept");
    }

    let array = server.status_array();
    assert_eq!(array.len(), 3);
    let stamps: Vec<SystemTime> = array.status_list.iter().map(|e| e.info.stamp).collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(server.active_goal_count(), 3);
    assert_eq!(server.goal_ids().len(), 3);
    assert_eq!(transport.latest_status(), Some(array));
}

#[test]
fn expiry_with_zero_timeout_drops_terminal_goals() {
    let transport = Arc::new(IntraProcessTransport::<Fib>::new());
    let server = ActionServer::<Fib>::builder("fib")
        .on_goal(|_, _| GoalResponse::Accept)
        .on_cancel(|_| CancelResponse::Accept)
        .on_accepted(|_| {})
        .options(crate::config::ActionServerOptions::default().with_result_timeout(Duration::ZERO))
        .build(transport.clone())
        .expect("server");

    let done = GoalId::from_u128(1);
    let running = GoalId::from_u128(2);
    for (n, goal_id) in [done, running].into_iter().enumerate() {
        server
            .handle_goal_request(RequestId(n as u64), GoalRequest { goal_id, goal: 1 })
            .expect("accept");
    }
    let handle = server.goal_handle(done).expect("handle");
    handle.execute().expect("execute");
    handle.succeed(vec![1]).expect("succeed");

    assert_eq!(server.expire_goals().expect("expire"), 1);
    assert!(server.goal_handle(done).is_none());
    assert!(server.goal_handle(running).is_some());
    assert_eq!(
        transport.latest_status().expect("status").status_of(done),
        None
    );
    assert_eq!(server.expire_goals().expect("expire"), 0);
}
