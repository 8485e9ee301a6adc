// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Action server: goal map, request dispatch and status publication.
//!
//! The server is itself a [`Waitable`]: it registers its three service
//! handles and its result-expiry timer, and `execute()` drains whichever
//! of them the last `update()` found ready. The `handle_*_request` entry
//! points are public so a custom executor or a test can dispatch directly.

use super::goal_handle::{GoalHandle, GoalObserver};
use super::transport::ActionTransport;
use super::types::{
    ActionType, CancelReply, CancelRequest, CancelResponse, CancelReturnCode, GoalId, GoalInfo,
    GoalReply, GoalRequest, GoalResponse, GoalStatus, GoalStatusArray, GoalStatusEntry,
    RequestId, ResultReply, ResultRequest,
};
use crate::config::{ActionServerOptions, ACTION_SERVER_SERVICES, ACTION_SERVER_TIMERS};
use crate::entity::{Timer, WaitEntity};
use crate::error::{Error, Result};
use crate::waitable::Waitable;
use crate::waitset::WaitSet;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Instant, SystemTime};

/// Goal decision: `(goal_id, request payload) -> Accept | Reject`.
pub type GoalCallback<A> =
    Box<dyn Fn(GoalId, &<A as ActionType>::Goal) -> GoalResponse + Send + Sync>;

/// Cancel decision for one non-terminal goal.
pub type CancelCallback<A> = Box<dyn Fn(&Arc<GoalHandle<A>>) -> CancelResponse + Send + Sync>;

/// Execution entry point, handed every accepted goal.
pub type AcceptedCallback<A> = Box<dyn Fn(Arc<GoalHandle<A>>) + Send + Sync>;

pub struct ActionServerBuilder<A: ActionType> {
    name: String,
    on_goal: Option<GoalCallback<A>>,
    on_cancel: Option<CancelCallback<A>>,
    on_accepted: Option<AcceptedCallback<A>>,
    options: ActionServerOptions,
}

impl<A: ActionType> ActionServerBuilder<A> {
    pub fn on_goal<F>(mut self, callback: F) -> Self
    where
        F: Fn(GoalId, &A::Goal) -> GoalResponse + Send + Sync + 'static,
    {
        self.on_goal = Some(Box::new(callback));
        self
    }

    pub fn on_cancel<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Arc<GoalHandle<A>>) -> CancelResponse + Send + Sync + 'static,
    {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    pub fn on_accepted<F>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<GoalHandle<A>>) + Send + Sync + 'static,
    {
        self.on_accepted = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn options(mut self, options: ActionServerOptions) -> Self {
        self.options = options;
        self
    }

    /// Fails with `InvalidArgument` if any of the three callbacks is missing.
    pub fn build(self, transport: Arc<dyn ActionTransport<A>>) -> Result<ActionServer<A>> {
        let missing = |what: &str| Error::InvalidArgument(format!("{what} callback is required"));
        let on_goal = self.on_goal.ok_or_else(|| missing("goal"))?;
        let on_cancel = self.on_cancel.ok_or_else(|| missing("cancel"))?;
        let on_accepted = self.on_accepted.ok_or_else(|| missing("accepted"))?;

        log::info!(
            "[action] server '{}' ({}) result_timeout={:?}",
            self.name,
            A::type_name(),
            self.options.result_timeout
        );

        Ok(ActionServer {
            shared: Arc::new(ServerShared {
                name: self.name,
                transport,
                goals: DashMap::new(),
                on_goal,
                on_cancel,
                on_accepted,
                options: self.options,
                expiry: Arc::new(Timer::disarmed()),
                status_lock: Mutex::new(()),
                goal_ready: AtomicBool::new(false),
                cancel_ready: AtomicBool::new(false),
                result_ready: AtomicBool::new(false),
                expiry_ready: AtomicBool::new(false),
            }),
        })
    }
}

struct ServerShared<A: ActionType> {
    name: String,
    transport: Arc<dyn ActionTransport<A>>,
    goals: DashMap<GoalId, Arc<GoalHandle<A>>>,
    on_goal: GoalCallback<A>,
    on_cancel: CancelCallback<A>,
    on_accepted: AcceptedCallback<A>,
    options: ActionServerOptions,
    expiry: Arc<Timer>,
    status_lock: Mutex<()>,
    goal_ready: AtomicBool,
    cancel_ready: AtomicBool,
    result_ready: AtomicBool,
    expiry_ready: AtomicBool,
}

impl<A: ActionType> ServerShared<A> {
    fn status_array(&self) -> GoalStatusArray {
        let mut status_list: Vec<GoalStatusEntry> = self
            .goals
            .iter()
            .map(|entry| GoalStatusEntry {
                info: entry.value().info(),
                status: entry.value().status(),
            })
            .collect();
        status_list.sort_by(|a, b| {
            (a.info.stamp, a.info.goal_id).cmp(&(b.info.stamp, b.info.goal_id))
        });
        GoalStatusArray { status_list }
    }

    /// Publication is serialised and each array is snapshotted under the
    /// lock, so the last one out reflects every completed transition.
    fn publish_status(&self) -> Result<()> {
        let _serial = self.status_lock.lock();
        let array = self.status_array();
        self.transport.publish_status(array).map_err(|e| {
            log::warn!("[action] '{}' status publish failed: {}", self.name, e);
            e
        })
    }

    fn arm_expiry(&self, terminal_at: Instant) {
        if let Some(deadline) = terminal_at.checked_add(self.options.result_timeout) {
            self.expiry.reset_at_earliest(deadline);
        }
    }
}

impl<A: ActionType> GoalObserver<A> for ServerShared<A> {
    fn on_transition(&self, _goal_id: GoalId, _status: GoalStatus) -> Result<()> {
        self.publish_status()
    }

    fn on_terminal(&self, handle: &GoalHandle<A>, waiting: Vec<RequestId>) -> Result<()> {
        let mut first_error = self.publish_status().err();

        if !waiting.is_empty() {
            let reply = handle.result_reply();
            for request_id in waiting {
                if let Err(e) = self.transport.send_result_response(request_id, reply.clone()) {
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(at) = handle.terminal_at() {
            self.arm_expiry(at);
        }
        first_error.map_or(Ok(()), Err)
    }

    fn on_feedback(&self, goal_id: GoalId, feedback: A::Feedback) -> Result<()> {
        self.transport.publish_feedback(goal_id, feedback)
    }
}

/// Action server. Cloning shares the same goal map and transport.
pub struct ActionServer<A: ActionType> {
    shared: Arc<ServerShared<A>>,
}

impl<A: ActionType> Clone for ActionServer<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A: ActionType> ActionServer<A> {
    pub fn builder(name: impl Into<String>) -> ActionServerBuilder<A> {
        ActionServerBuilder {
            name: name.into(),
            on_goal: None,
            on_cancel: None,
            on_accepted: None,
            options: ActionServerOptions::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    #[must_use]
    pub fn options(&self) -> &ActionServerOptions {
        &self.shared.options
    }

    #[must_use]
    pub fn goal_handle(&self, goal_id: GoalId) -> Option<Arc<GoalHandle<A>>> {
        self.shared
            .goals
            .get(&goal_id)
            .map(|entry| entry.value().clone())
    }

    /// Ids of every retained goal, ordered by acceptance.
    #[must_use]
    pub fn goal_ids(&self) -> Vec<GoalId> {
        self.status_array()
            .status_list
            .into_iter()
            .map(|entry| entry.info.goal_id)
            .collect()
    }

    #[must_use]
    pub fn active_goal_count(&self) -> usize {
        self.shared
            .goals
            .iter()
            .filter(|entry| entry.value().is_active())
            .count()
    }

    #[must_use]
    pub fn status_array(&self) -> GoalStatusArray {
        self.shared.status_array()
    }

    /// Publish the current status array. Use it to retry after a transport
    /// failure surfaced from a transition.
    pub fn publish_status(&self) -> Result<()> {
        self.shared.publish_status()
    }

    /// Handle one goal request: decide, insert, reply, publish, hand off.
    pub fn handle_goal_request(
        &self,
        request_id: RequestId,
        request: GoalRequest<A::Goal>,
    ) -> Result<()> {
        let shared = &self.shared;
        let goal_id = request.goal_id;

        if shared.goals.contains_key(&goal_id) {
            return self.reject_conflict(request_id, goal_id);
        }

        if (shared.on_goal)(goal_id, &request.goal) == GoalResponse::Reject {
            log::debug!("[action] '{}' goal {} rejected", shared.name, goal_id);
            return shared.transport.send_goal_response(
                request_id,
                GoalReply {
                    accepted: false,
                    stamp: SystemTime::now(),
                },
            );
        }

        let info = GoalInfo {
            goal_id,
            stamp: SystemTime::now(),
        };
        let shared_weak = Arc::downgrade(&self.shared);
        let observer: Weak<dyn GoalObserver<A>> = shared_weak;
        let handle = Arc::new(GoalHandle::new(info, request.goal, observer));

        let inserted = match shared.goals.entry(goal_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle.clone());
                true
            }
        };
        if !inserted {
            return self.reject_conflict(request_id, goal_id);
        }

        log::debug!("[action] '{}' goal {} accepted", shared.name, goal_id);

        let sent = shared.transport.send_goal_response(
            request_id,
            GoalReply {
                accepted: true,
                stamp: info.stamp,
            },
        );
        let published = shared.publish_status();
        (shared.on_accepted)(handle);
        sent.and(published)
    }

    fn reject_conflict(&self, request_id: RequestId, goal_id: GoalId) -> Result<()> {
        log::warn!(
            "[action] '{}' goal id {} already in use, rejecting",
            self.shared.name,
            goal_id
        );
        let reply = GoalReply {
            accepted: false,
            stamp: SystemTime::now(),
        };
        if let Err(e) = self.shared.transport.send_goal_response(request_id, reply) {
            log::warn!("[action] '{}' conflict reply failed: {}", self.shared.name, e);
        }
        Err(Error::GoalIdConflict(goal_id))
    }

    /// Offer every matching non-terminal goal to the cancel callback and
    /// move accepted ones to CANCELING. Does not publish; callers publish
    /// once for the batch.
    pub(crate) fn process_cancel(&self, request: &CancelRequest) -> CancelReply {
        let shared = &self.shared;

        let mut candidates: Vec<Arc<GoalHandle<A>>> = shared
            .goals
            .iter()
            .filter(|entry| request.matches(&entry.value().info()))
            .map(|entry| entry.value().clone())
            .collect();
        candidates.sort_by_key(|handle| (handle.info().stamp, handle.goal_id()));

        let mut goals_canceling = Vec::new();
        for handle in candidates.iter().filter(|handle| handle.is_active()) {
            if (shared.on_cancel)(handle) == CancelResponse::Accept && handle.mark_canceling() {
                goals_canceling.push(handle.info());
            }
        }

        let return_code = if !goals_canceling.is_empty() {
            CancelReturnCode::None
        } else {
            match request.goal_id {
                Some(id) => match self.goal_handle(id) {
                    None => CancelReturnCode::UnknownGoalId,
                    Some(handle) if handle.status().is_terminal() => {
                        CancelReturnCode::GoalTerminated
                    }
                    Some(_) => CancelReturnCode::Rejected,
                },
                None => CancelReturnCode::Rejected,
            }
        };

        CancelReply {
            return_code,
            goals_canceling,
        }
    }

    /// Handle one cancel request: decide per goal, publish, reply.
    ///
    /// Status is published before the reply is sent, so a client holding
    /// the reply already sees the goals as CANCELING.
    pub fn handle_cancel_request(&self, request_id: RequestId, request: CancelRequest) -> Result<()> {
        let reply = self.process_cancel(&request);
        log::debug!(
            "[action] '{}' cancel {:?}: {:?}, {} goal(s) canceling",
            self.shared.name,
            request,
            reply.return_code,
            reply.goals_canceling.len()
        );

        let published = if reply.goals_canceling.is_empty() {
            Ok(())
        } else {
            self.shared.publish_status()
        };
        let sent = self.shared.transport.send_cancel_response(request_id, reply);
        published.and(sent)
    }

    /// Handle one result request.
    ///
    /// Terminal goals are answered at once; active goals park the request
    /// until they terminate. Unknown goals get an `Unknown` reply and the
    /// call returns `UnknownGoal`.
    pub fn handle_result_request(&self, request_id: RequestId, request: ResultRequest) -> Result<()> {
        let goal_id = request.goal_id;
        let Some(handle) = self.goal_handle(goal_id) else {
            log::debug!("[action] '{}' result for unknown goal {}", self.shared.name, goal_id);
            self.shared
                .transport
                .send_result_response(request_id, ResultReply::unknown())?;
            return Err(Error::UnknownGoal(goal_id));
        };

        match handle.result_or_enqueue(request_id) {
            Some(reply) => self.shared.transport.send_result_response(request_id, reply),
            None => {
                log::debug!(
                    "[action] '{}' result for goal {} pending",
                    self.shared.name,
                    goal_id
                );
                Ok(())
            }
        }
    }

    /// Drop terminal goals whose result outlived `result_timeout`.
    ///
    /// Returns how many goals were removed and re-arms the expiry timer
    /// for the next candidate.
    pub fn expire_goals(&self) -> Result<usize> {
        let shared = &self.shared;
        let timeout = shared.options.result_timeout;
        let now = Instant::now();

        let expired: Vec<GoalId> = shared
            .goals
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .terminal_at()
                    .is_some_and(|at| now.saturating_duration_since(at) >= timeout)
            })
            .map(|entry| *entry.key())
            .collect();

        for goal_id in &expired {
            shared.goals.remove(goal_id);
            log::debug!("[action] '{}' goal {} expired", shared.name, goal_id);
        }

        // Cancel first so a goal terminating concurrently re-arms on its own.
        shared.expiry.cancel();
        let pending: Vec<Instant> = shared
            .goals
            .iter()
            .filter_map(|entry| entry.value().terminal_at())
            .collect();
        for at in pending {
            shared.arm_expiry(at);
        }

        if expired.is_empty() {
            Ok(0)
        } else {
            shared.publish_status()?;
            Ok(expired.len())
        }
    }

    fn drain<T>(
        first_error: &mut Option<Error>,
        mut take: impl FnMut() -> Result<Option<(RequestId, T)>>,
        mut handle: impl FnMut(RequestId, T) -> Result<()>,
    ) {
        loop {
            match take() {
                Ok(Some((request_id, request))) => {
                    if let Err(e) = handle(request_id, request) {
                        first_error.get_or_insert(e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    first_error.get_or_insert(e);
                    break;
                }
            }
        }
    }
}

impl<A: ActionType> Waitable for ActionServer<A> {
    fn get_number_of_ready_timers(&self) -> usize {
        ACTION_SERVER_TIMERS
    }

    fn get_number_of_ready_services(&self) -> usize {
        ACTION_SERVER_SERVICES
    }

    fn add_to_wait_set(&self, wait_set: &mut WaitSet) -> Result<()> {
        let transport = &self.shared.transport;
        wait_set.add(transport.goal_service())?;
        wait_set.add(transport.cancel_service())?;
        wait_set.add(transport.result_service())?;
        wait_set.add(self.shared.expiry.clone())
    }

    fn update(&self, wait_set: &WaitSet) {
        let shared = &self.shared;
        let transport = &shared.transport;
        let flags = [
            (&shared.goal_ready, transport.goal_service().entity_id()),
            (&shared.cancel_ready, transport.cancel_service().entity_id()),
            (&shared.result_ready, transport.result_service().entity_id()),
            (&shared.expiry_ready, shared.expiry.entity_id()),
        ];
        for (flag, id) in flags {
            flag.store(wait_set.is_ready(id), Ordering::Release);
        }
    }

    fn is_ready(&self) -> bool {
        let shared = &self.shared;
        [
            &shared.goal_ready,
            &shared.cancel_ready,
            &shared.result_ready,
            &shared.expiry_ready,
        ]
        .iter()
        .any(|flag| flag.load(Ordering::Acquire))
    }

    fn execute(&self) -> Result<()> {
        let shared = &self.shared;
        let transport = &shared.transport;
        let mut first_error = None;

        if shared.goal_ready.swap(false, Ordering::AcqRel) {
            Self::drain(
                &mut first_error,
                || transport.take_goal_request(),
                |id, request| self.handle_goal_request(id, request),
            );
        }

        if shared.cancel_ready.swap(false, Ordering::AcqRel) {
            Self::drain(
                &mut first_error,
                || transport.take_cancel_request(),
                |id, request| self.handle_cancel_request(id, request),
            );
        }

        if shared.result_ready.swap(false, Ordering::AcqRel) {
            Self::drain(
                &mut first_error,
                || transport.take_result_request(),
                |id, request| self.handle_result_request(id, request),
            );
        }

        if shared.expiry_ready.swap(false, Ordering::AcqRel) && shared.expiry.take() {
            if let Err(e) = self.expire_goals() {
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = &first_error {
            log::warn!("[action] '{}' dispatch error: {}", shared.name, e);
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<A: ActionType> fmt::Debug for ActionServer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionServer")
            .field("name", &self.shared.name)
            .field("action", &A::type_name())
            .field("goals", &self.shared.goals.len())
            .finish()
    }
}
