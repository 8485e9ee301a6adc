// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::types::{
    ActionType, CancelReply, CancelRequest, GoalId, GoalReply, GoalRequest, GoalStatusArray,
    RequestId, ResultReply, ResultRequest,
};
use crate::entity::EntityHandle;
use crate::error::Result;
use std::sync::Arc;

/// Endpoints an [`ActionServer`](super::ActionServer) runs on.
///
/// Each service exposes a pollable [`EntityHandle`] whose pending count
/// tracks queued requests: `take_*_request` hands one request out and
/// consumes one unit of readiness. Failures are reported as
/// [`Error::TransportFailure`](crate::Error::TransportFailure).
pub trait ActionTransport<A: ActionType>: Send + Sync {
    fn goal_service(&self) -> Arc<EntityHandle>;
    fn cancel_service(&self) -> Arc<EntityHandle>;
    fn result_service(&self) -> Arc<EntityHandle>;

    fn take_goal_request(&self) -> Result<Option<(RequestId, GoalRequest<A::Goal>)>>;
    fn take_cancel_request(&self) -> Result<Option<(RequestId, CancelRequest)>>;
    fn take_result_request(&self) -> Result<Option<(RequestId, ResultRequest)>>;

    fn send_goal_response(&self, request_id: RequestId, reply: GoalReply) -> Result<()>;
    fn send_cancel_response(&self, request_id: RequestId, reply: CancelReply) -> Result<()>;
    fn send_result_response(
        &self,
        request_id: RequestId,
        reply: ResultReply<A::Result>,
    ) -> Result<()>;

    fn publish_status(&self, status: GoalStatusArray) -> Result<()>;
    fn publish_feedback(&self, goal_id: GoalId, feedback: A::Feedback) -> Result<()>;
}
