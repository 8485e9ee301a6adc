// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-goal state machine.
//!
//! ```text
//! ACCEPTED --execute--> EXECUTING --succeed/abort/canceled--> terminal
//!     \                     |                                    ^
//!      \---cancel--->  CANCELING ---succeed/abort/canceled-------/
//! ```
//!
//! The state lives in one atomic updated by compare-and-swap, so a cancel
//! racing a terminal outcome resolves to exactly one winner. Terminal
//! transitions additionally hold the outcome lock, which is what makes a
//! result request racing the termination answered exactly once.

use super::types::{ActionType, GoalId, GoalInfo, GoalStatus, RequestId, ResultReply};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Weak;
use std::time::Instant;

/// Server-side sink for handle events.
pub(crate) trait GoalObserver<A: ActionType>: Send + Sync {
    /// A non-terminal transition happened.
    fn on_transition(&self, goal_id: GoalId, status: GoalStatus) -> Result<()>;

    /// The goal terminated; `waiting` are result requests held until now.
    fn on_terminal(&self, handle: &GoalHandle<A>, waiting: Vec<RequestId>) -> Result<()>;

    fn on_feedback(&self, goal_id: GoalId, feedback: A::Feedback) -> Result<()>;
}

struct Outcome<R> {
    result: Option<R>,
    terminal_at: Option<Instant>,
    waiting: Vec<RequestId>,
}

/// Shared by the server (status, results, expiry) and the user execution
/// routine (progress and outcome).
pub struct GoalHandle<A: ActionType> {
    info: GoalInfo,
    goal: A::Goal,
    state: AtomicU8,
    cancel_requested: AtomicBool,
    outcome: Mutex<Outcome<A::Result>>,
    observer: Weak<dyn GoalObserver<A>>,
}

impl<A: ActionType> GoalHandle<A> {
    pub(crate) fn new(info: GoalInfo, goal: A::Goal, observer: Weak<dyn GoalObserver<A>>) -> Self {
        Self {
            info,
            goal,
            state: AtomicU8::new(GoalStatus::Accepted as u8),
            cancel_requested: AtomicBool::new(false),
            outcome: Mutex::new(Outcome {
                result: None,
                terminal_at: None,
                waiting: Vec::new(),
            }),
            observer,
        }
    }

    #[must_use]
    pub fn goal_id(&self) -> GoalId {
        self.info.goal_id
    }

    #[must_use]
    pub fn info(&self) -> GoalInfo {
        self.info
    }

    /// The request payload.
    #[must_use]
    pub fn goal(&self) -> &A::Goal {
        &self.goal
    }

    #[must_use]
    pub fn status(&self) -> GoalStatus {
        decode(self.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.status() == GoalStatus::Executing
    }

    #[must_use]
    pub fn is_canceling(&self) -> bool {
        self.status() == GoalStatus::Canceling
    }

    /// Set once a cancel request was accepted, including one that lost
    /// the race to a terminal outcome. Never cleared. Always set while the
    /// goal is CANCELING.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Stored result, once terminal.
    #[must_use]
    pub fn result(&self) -> Option<A::Result> {
        self.outcome.lock().result.clone()
    }

    /// ACCEPTED -> EXECUTING.
    pub fn execute(&self) -> Result<()> {
        let current = self.status();
        if current != GoalStatus::Accepted {
            return Err(self.invalid(current, GoalStatus::Executing));
        }
        self.state
            .compare_exchange(
                GoalStatus::Accepted as u8,
                GoalStatus::Executing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|actual| self.invalid(decode(actual), GoalStatus::Executing))?;

        log::debug!("[action] goal {} ACCEPTED -> EXECUTING", self.info.goal_id);
        self.notify_transition(GoalStatus::Executing)
    }

    pub fn succeed(&self, result: A::Result) -> Result<()> {
        self.finish(GoalStatus::Succeeded, result)
    }

    pub fn abort(&self, result: A::Result) -> Result<()> {
        self.finish(GoalStatus::Aborted, result)
    }

    /// Acknowledge a cancel request with a final result.
    pub fn canceled(&self, result: A::Result) -> Result<()> {
        self.finish(GoalStatus::Canceled, result)
    }

    /// Forward progress to the action clients.
    pub fn publish_feedback(&self, feedback: A::Feedback) -> Result<()> {
        let status = self.status();
        if status.is_terminal() {
            return Err(Error::AlreadyTerminal {
                goal_id: self.info.goal_id,
                status,
            });
        }
        match self.observer.upgrade() {
            Some(observer) => observer.on_feedback(self.info.goal_id, feedback),
            None => Ok(()),
        }
    }

    /// ACCEPTED|EXECUTING -> CANCELING.
    ///
    /// Returns `true` when the goal is now CANCELING (including when it
    /// already was) and `false` when it terminated first. Status is not
    /// published here; the cancel dispatch publishes once for the batch.
    pub(crate) fn mark_canceling(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            match decode(current) {
                GoalStatus::Canceling => {
                    self.cancel_requested.store(true, Ordering::Release);
                    return true;
                }
                GoalStatus::Accepted | GoalStatus::Executing => {}
                _ => return false,
            }
            // Raised before the CAS so CANCELING always implies the flag.
            self.cancel_requested.store(true, Ordering::Release);
            match self.state.compare_exchange_weak(
                current,
                GoalStatus::Canceling as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    log::debug!(
                        "[action] goal {} {:?} -> CANCELING",
                        self.info.goal_id,
                        decode(current)
                    );
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Reply now when terminal, otherwise park `request_id` until the
    /// outcome is known.
    pub(crate) fn result_or_enqueue(&self, request_id: RequestId) -> Option<ResultReply<A::Result>> {
        let mut outcome = self.outcome.lock();
        let status = self.status();
        if status.is_terminal() {
            return Some(ResultReply {
                status,
                result: outcome.result.clone(),
            });
        }
        outcome.waiting.push(request_id);
        None
    }

    pub(crate) fn result_reply(&self) -> ResultReply<A::Result> {
        let outcome = self.outcome.lock();
        ResultReply {
            status: self.status(),
            result: outcome.result.clone(),
        }
    }

    pub(crate) fn terminal_at(&self) -> Option<Instant> {
        self.outcome.lock().terminal_at
    }

    fn finish(&self, to: GoalStatus, result: A::Result) -> Result<()> {
        let (from, waiting) = {
            let mut outcome = self.outcome.lock();
            let from = self.commit_terminal(to)?;
            outcome.result = Some(result);
            outcome.terminal_at = Some(Instant::now());
            (from, std::mem::take(&mut outcome.waiting))
        };

        log::debug!(
            "[action] goal {} {:?} -> {:?} (pending results: {})",
            self.info.goal_id,
            from,
            to,
            waiting.len()
        );

        match self.observer.upgrade() {
            Some(observer) => observer.on_terminal(self, waiting),
            None => Ok(()),
        }
    }

    fn commit_terminal(&self, to: GoalStatus) -> Result<GoalStatus> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let status = decode(current);
            if status.is_terminal() {
                return Err(Error::AlreadyTerminal {
                    goal_id: self.info.goal_id,
                    status,
                });
            }
            if !matches!(status, GoalStatus::Executing | GoalStatus::Canceling) {
                return Err(self.invalid(status, to));
            }
            match self.state.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(status),
                Err(actual) => current = actual,
            }
        }
    }

    fn notify_transition(&self, status: GoalStatus) -> Result<()> {
        match self.observer.upgrade() {
            Some(observer) => observer.on_transition(self.info.goal_id, status),
            None => Ok(()),
        }
    }

    fn invalid(&self, from: GoalStatus, to: GoalStatus) -> Error {
        Error::InvalidTransition {
            goal_id: self.info.goal_id,
            from,
            to,
        }
    }
}

fn decode(raw: u8) -> GoalStatus {
    i8::try_from(raw)
        .ok()
        .and_then(GoalStatus::from_i8)
        .unwrap_or(GoalStatus::Unknown)
}

impl<A: ActionType> fmt::Debug for GoalHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoalHandle")
            .field("goal_id", &self.info.goal_id)
            .field("status", &self.status())
            .field("cancel_requested", &self.is_cancel_requested())
            .finish()
    }
}
