// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by the waitset and action layers.
//!
//! Contract errors (`InvalidTransition`, `AlreadyTerminal`, `GoalIdConflict`)
//! are reported as-is and never coerced into another transition. Capacity
//! and registration errors are recoverable by the executor: rebuild the
//! waitset with adjusted membership and retry. Transport failures come from
//! the collaborator layer and never roll back a transition that already
//! happened; retry the publish step instead.

use crate::action::{GoalId, GoalStatus};
use crate::entity::EntityKind;
use thiserror::Error;

/// Boxed error raised by a transport implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by waitset and action server operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The waitset has no free slot left for this entity kind.
    #[error("waitset capacity exceeded for {kind:?} (max {capacity})")]
    CapacityExceeded { kind: EntityKind, capacity: usize },

    /// The entity already belongs to a live waitset.
    #[error("entity {entity_id} already registered with waitset {wait_set_id}")]
    AlreadyRegistered { entity_id: u64, wait_set_id: u64 },

    /// The requested goal transition is not allowed from the current state.
    #[error("goal {goal_id}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        goal_id: GoalId,
        from: GoalStatus,
        to: GoalStatus,
    },

    /// The goal already reached SUCCEEDED, ABORTED or CANCELED.
    #[error("goal {goal_id} already terminal ({status:?})")]
    AlreadyTerminal { goal_id: GoalId, status: GoalStatus },

    /// A goal with the same id is already tracked by the server.
    #[error("goal id {0} already in use")]
    GoalIdConflict(GoalId),

    /// No goal with this id is tracked by the server.
    #[error("unknown goal {0}")]
    UnknownGoal(GoalId),

    /// Failure propagated from the transport collaborator.
    #[error("transport failure: {0}")]
    TransportFailure(#[source] TransportError),

    /// Invalid argument or incomplete configuration.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Wrap any transport-level error.
    pub fn transport(err: impl Into<TransportError>) -> Self {
        Self::TransportFailure(err.into())
    }

    /// True for errors the executor recovers from by rebuilding the waitset.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::AlreadyRegistered { .. }
        )
    }
}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_keeps_source() {
        let err = Error::transport("link down");
        assert!(err.to_string().contains("link down"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn capacity_errors_are_recoverable() {
        let err = Error::CapacityExceeded {
            kind: EntityKind::Timer,
            capacity: 2,
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("max 2"));
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = Error::InvalidTransition {
            goal_id: GoalId::from_bytes([0xab; 16]),
            from: GoalStatus::Succeeded,
            to: GoalStatus::Executing,
        };
        let text = err.to_string();
        assert!(text.contains("Succeeded"));
        assert!(text.contains("Executing"));
        assert!(text.contains("abab"));
    }
}
