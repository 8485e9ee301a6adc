// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport: requests travel through crossbeam channels,
//! replies and publications are recorded for the client side to inspect.

use super::transport::ActionTransport;
use super::types::{
    ActionType, CancelReply, CancelRequest, GoalId, GoalReply, GoalRequest, GoalStatusArray,
    RequestId, ResultReply, ResultRequest,
};
use crate::entity::{EntityHandle, WaitEntity};
use crate::error::{Error, Result};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

struct RequestQueue<T> {
    service: Arc<EntityHandle>,
    tx: Sender<(RequestId, T)>,
    rx: Receiver<(RequestId, T)>,
}

impl<T> RequestQueue<T> {
    fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            service: Arc::new(EntityHandle::service()),
            tx,
            rx,
        }
    }

    /// Readiness is raised before the request is queued: the pending count
    /// never falls below the queue length, and a consumer polling in
    /// between leaves the unit for the request that follows.
    fn push(&self, request_id: RequestId, request: T) -> Result<()> {
        self.service.mark_ready();
        if self.tx.send((request_id, request)).is_err() {
            self.service.take();
            return Err(Error::transport("request channel closed"));
        }
        Ok(())
    }

    fn pop(&self) -> Option<(RequestId, T)> {
        let item = self.rx.try_recv().ok()?;
        self.service.take();
        Some(item)
    }
}

/// Loopback [`ActionTransport`] for tests and single-process setups.
pub struct IntraProcessTransport<A: ActionType> {
    goals: RequestQueue<GoalRequest<A::Goal>>,
    cancels: RequestQueue<CancelRequest>,
    results: RequestQueue<ResultRequest>,
    next_request: AtomicU64,
    goal_replies: Mutex<HashMap<RequestId, GoalReply>>,
    cancel_replies: Mutex<HashMap<RequestId, CancelReply>>,
    result_replies: Mutex<HashMap<RequestId, ResultReply<A::Result>>>,
    status: Mutex<Vec<GoalStatusArray>>,
    feedback: Mutex<Vec<(GoalId, A::Feedback)>>,
    fail_publish: AtomicBool,
}

impl<A: ActionType> Default for IntraProcessTransport<A> {
    fn default() -> Self {
        Self {
            goals: RequestQueue::new(),
            cancels: RequestQueue::new(),
            results: RequestQueue::new(),
            next_request: AtomicU64::new(1),
            goal_replies: Mutex::new(HashMap::new()),
            cancel_replies: Mutex::new(HashMap::new()),
            result_replies: Mutex::new(HashMap::new()),
            status: Mutex::new(Vec::new()),
            feedback: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
        }
    }
}

impl<A: ActionType> IntraProcessTransport<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> RequestId {
        RequestId(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    // Client side

    pub fn send_goal(&self, goal_id: GoalId, goal: A::Goal) -> Result<RequestId> {
        let id = self.next_id();
        self.goals.push(id, GoalRequest { goal_id, goal })?;
        Ok(id)
    }

    pub fn send_cancel(&self, request: CancelRequest) -> Result<RequestId> {
        let id = self.next_id();
        self.cancels.push(id, request)?;
        Ok(id)
    }

    pub fn request_result(&self, goal_id: GoalId) -> Result<RequestId> {
        let id = self.next_id();
        self.results.push(id, ResultRequest { goal_id })?;
        Ok(id)
    }

    #[must_use]
    pub fn goal_reply(&self, request_id: RequestId) -> Option<GoalReply> {
        self.goal_replies.lock().get(&request_id).copied()
    }

    #[must_use]
    pub fn cancel_reply(&self, request_id: RequestId) -> Option<CancelReply> {
        self.cancel_replies.lock().get(&request_id).cloned()
    }

    #[must_use]
    pub fn result_reply(&self, request_id: RequestId) -> Option<ResultReply<A::Result>> {
        self.result_replies.lock().get(&request_id).cloned()
    }

    /// Every status array published so far, oldest first.
    #[must_use]
    pub fn status_history(&self) -> Vec<GoalStatusArray> {
        self.status.lock().clone()
    }

    #[must_use]
    pub fn latest_status(&self) -> Option<GoalStatusArray> {
        self.status.lock().last().cloned()
    }

    #[must_use]
    pub fn feedback_for(&self, goal_id: GoalId) -> Vec<A::Feedback> {
        self.feedback
            .lock()
            .iter()
            .filter(|(id, _)| *id == goal_id)
            .map(|(_, fb)| fb.clone())
            .collect()
    }

    /// Make the next status or feedback publish fail once.
    pub fn fail_next_publish(&self) {
        self.fail_publish.store(true, Ordering::Release);
    }

    fn check_publish(&self) -> Result<()> {
        if self.fail_publish.swap(false, Ordering::AcqRel) {
            return Err(Error::transport("injected publish failure"));
        }
        Ok(())
    }
}

impl<A: ActionType> ActionTransport<A> for IntraProcessTransport<A> {
    fn goal_service(&self) -> Arc<EntityHandle> {
        self.goals.service.clone()
    }

    fn cancel_service(&self) -> Arc<EntityHandle> {
        self.cancels.service.clone()
    }

    fn result_service(&self) -> Arc<EntityHandle> {
        self.results.service.clone()
    }

    fn take_goal_request(&self) -> Result<Option<(RequestId, GoalRequest<A::Goal>)>> {
        Ok(self.goals.pop())
    }

    fn take_cancel_request(&self) -> Result<Option<(RequestId, CancelRequest)>> {
        Ok(self.cancels.pop())
    }

    fn take_result_request(&self) -> Result<Option<(RequestId, ResultRequest)>> {
        Ok(self.results.pop())
    }

    fn send_goal_response(&self, request_id: RequestId, reply: GoalReply) -> Result<()> {
        self.goal_replies.lock().insert(request_id, reply);
        Ok(())
    }

    fn send_cancel_response(&self, request_id: RequestId, reply: CancelReply) -> Result<()> {
        self.cancel_replies.lock().insert(request_id, reply);
        Ok(())
    }

    fn send_result_response(
        &self,
        request_id: RequestId,
        reply: ResultReply<A::Result>,
    ) -> Result<()> {
        self.result_replies.lock().insert(request_id, reply);
        Ok(())
    }

    fn publish_status(&self, status: GoalStatusArray) -> Result<()> {
        self.check_publish()?;
        self.status.lock().push(status);
        Ok(())
    }

    fn publish_feedback(&self, goal_id: GoalId, feedback: A::Feedback) -> Result<()> {
        self.check_publish()?;
        self.feedback.lock().push((goal_id, feedback));
        Ok(())
    }
}

impl<A: ActionType> fmt::Debug for IntraProcessTransport<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntraProcessTransport")
            .field("action", &A::type_name())
            .field("pending_goals", &self.goals.rx.len())
            .field("pending_cancels", &self.cancels.rx.len())
            .field("pending_results", &self.results.rx.len())
            .finish()
    }
}
