// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hdds-action - WaitSets and action servers for the HDDS client layer
//!
//! Two mechanisms of a ROS 2 style client library, with the transport kept
//! behind a trait:
//!
//! - a **waitset** that blocks once across subscriptions, timers, clients,
//!   services and guard conditions, dispatching through composable
//!   [`Waitable`] objects
//! - an **action server** that tracks concurrent goals, each with its own
//!   state machine, and serves goal, cancel and result requests
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  Executor: add_to_wait_set -> wait -> update -> execute             |
//! +---------------------------------------------------------------------+
//! |  Waitables: EntityWaitable | CompositeWaitable | ActionServer       |
//! +---------------------------------------------------------------------+
//! |  WaitSet: per-kind slots, exclusive membership, WaitDriver wakeups  |
//! +---------------------------------------------------------------------+
//! |  Entities: EntityHandle | Timer | GuardCondition                    |
//! +---------------------------------------------------------------------+
//! |  ActionTransport (IntraProcessTransport, or a real middleware)      |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WaitSet`] | One blocking wait across registered primitives |
//! | [`Waitable`] | Readiness counts, registration, update, execute |
//! | [`Executor`] | Reference single-threaded dispatch loop |
//! | [`ActionServer`] | Goal map, request dispatch, status publication |
//! | [`GoalHandle`] | Per-goal state machine shared with the execution routine |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hdds_action::{Executor, GuardCondition, EntityWaitable};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> hdds_action::Result<()> {
//! let executor = Executor::new();
//! let guard = Arc::new(GuardCondition::new());
//! executor.add_waitable(Arc::new(EntityWaitable::guard_condition(guard.clone(), || {
//!     println!("woken");
//!     Ok(())
//! })));
//!
//! guard.trigger();
//! executor.spin_once(Some(Duration::from_millis(100)))?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod rt;
pub mod waitable;
pub mod waitset;

pub use action::{
    ActionServer, ActionServerBuilder, ActionTransport, ActionType, CancelResponse, GoalHandle,
    GoalId, GoalResponse, GoalStatus, IntraProcessTransport,
};
pub use config::{ActionServerOptions, ExecutorOptions};
pub use entity::{EntityHandle, EntityId, EntityKind, GuardCondition, Timer, WaitEntity};
pub use error::{Error, Result};
pub use executor::Executor;
pub use waitable::{CompositeWaitable, EntityWaitable, Waitable};
pub use waitset::{WaitResult, WaitSet, WaitSetCapacity};
