// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Goal, cancel and result protocol types (action_msgs numbering).

use std::fmt;
use std::time::SystemTime;

/// Payload types of one action. Payloads are opaque to the server.
pub trait ActionType: Send + Sync + 'static {
    type Goal: Send + Sync + 'static;
    type Result: Clone + Send + Sync + 'static;
    type Feedback: Clone + Send + Sync + 'static;

    /// Fully qualified type name, e.g. `example_interfaces/action/Fibonacci`.
    fn type_name() -> &'static str;
}

/// 16-byte goal identifier chosen by the client.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GoalId([u8; 16]);

impl GoalId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoalId({self})")
    }
}

/// Goal id plus the time the server accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalInfo {
    pub goal_id: GoalId,
    pub stamp: SystemTime,
}

/// Goal lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum GoalStatus {
    Unknown = 0,
    Accepted = 1,
    Executing = 2,
    Canceling = 3,
    Succeeded = 4,
    Canceled = 5,
    Aborted = 6,
}

impl GoalStatus {
    #[must_use]
    pub fn from_i8(value: i8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Accepted),
            2 => Some(Self::Executing),
            3 => Some(Self::Canceling),
            4 => Some(Self::Succeeded),
            5 => Some(Self::Canceled),
            6 => Some(Self::Aborted),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    /// SUCCEEDED, CANCELED or ABORTED.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Canceled | Self::Aborted)
    }

    /// ACCEPTED, EXECUTING or CANCELING.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Accepted | Self::Executing | Self::Canceling)
    }
}

/// Decision of the goal callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalResponse {
    Reject,
    Accept,
}

/// Decision of the cancel callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResponse {
    Reject,
    Accept,
}

/// Correlates a service request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct GoalRequest<G> {
    pub goal_id: GoalId,
    pub goal: G,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalReply {
    pub accepted: bool,
    pub stamp: SystemTime,
}

/// Which goals a cancel request targets.
///
/// | `goal_id` | `before` | targets |
/// |-----------|----------|---------|
/// | none | none | every goal |
/// | id | none | that goal |
/// | none | t | goals accepted at or before `t` |
/// | id | t | the union of both |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelRequest {
    pub goal_id: Option<GoalId>,
    pub before: Option<SystemTime>,
}

impl CancelRequest {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn goal(goal_id: GoalId) -> Self {
        Self {
            goal_id: Some(goal_id),
            before: None,
        }
    }

    #[must_use]
    pub fn before(stamp: SystemTime) -> Self {
        Self {
            goal_id: None,
            before: Some(stamp),
        }
    }

    pub(crate) fn matches(&self, info: &GoalInfo) -> bool {
        match (self.goal_id, self.before) {
            (None, None) => true,
            (Some(id), None) => info.goal_id == id,
            (None, Some(t)) => info.stamp <= t,
            (Some(id), Some(t)) => info.goal_id == id || info.stamp <= t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum CancelReturnCode {
    None = 0,
    Rejected = 1,
    UnknownGoalId = 2,
    GoalTerminated = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReply {
    pub return_code: CancelReturnCode,
    pub goals_canceling: Vec<GoalInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRequest {
    pub goal_id: GoalId,
}

/// Reply to a result request. `Unknown` status with no result for goals
/// the server does not track.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultReply<R> {
    pub status: GoalStatus,
    pub result: Option<R>,
}

impl<R> ResultReply<R> {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            status: GoalStatus::Unknown,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalStatusEntry {
    pub info: GoalInfo,
    pub status: GoalStatus,
}

/// Snapshot of every goal the server retains, ordered by stamp then id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoalStatusArray {
    pub status_list: Vec<GoalStatusEntry>,
}

impl GoalStatusArray {
    #[must_use]
    pub fn status_of(&self, goal_id: GoalId) -> Option<GoalStatus> {
        self.status_list
            .iter()
            .find(|entry| entry.info.goal_id == goal_id)
            .map(|entry| entry.status)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.status_list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status_list.is_empty()
    }
}
