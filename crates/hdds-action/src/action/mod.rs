// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Action server goal lifecycle.
//!
//! An action is a long-running request: the client sends a goal, the
//! server accepts or rejects it, streams feedback while executing and
//! finally stores one terminal result. Cancellation is cooperative: an
//! accepted cancel request only moves the goal to CANCELING, the execution
//! routine polls [`GoalHandle::is_canceling`] and declares the outcome.
//!
//! # Example
//!
//! ```rust,no_run
//! use hdds_action::action::{
//!     ActionServer, ActionType, CancelResponse, GoalId, GoalResponse, IntraProcessTransport,
//! };
//! use std::sync::Arc;
//!
//! struct Countdown;
//! impl ActionType for Countdown {
//!     type Goal = u32;
//!     type Result = u32;
//!     type Feedback = u32;
//!     fn type_name() -> &'static str {
//!         "demo/action/Countdown"
//!     }
//! }
//!
//! # fn main() -> hdds_action::Result<()> {
//! let transport = Arc::new(IntraProcessTransport::<Countdown>::new());
//! let server = ActionServer::<Countdown>::builder("countdown")
//!     .on_goal(|_, from| if *from > 0 { GoalResponse::Accept } else { GoalResponse::Reject })
//!     .on_cancel(|_| CancelResponse::Accept)
//!     .on_accepted(|goal| {
//!         std::thread::spawn(move || {
//!             let _ = goal.execute();
//!             let _ = goal.succeed(0);
//!         });
//!     })
//!     .build(transport.clone())?;
//!
//! transport.send_goal(GoalId::from_u128(1), 3)?;
//! # let _ = server;
//! # Ok(())
//! # }
//! ```

mod goal_handle;
mod intra;
mod server;
mod transport;
mod types;

pub use goal_handle::GoalHandle;
pub use intra::IntraProcessTransport;
pub use server::{
    AcceptedCallback, ActionServer, ActionServerBuilder, CancelCallback, GoalCallback,
};
pub use transport::ActionTransport;
pub use types::{
    ActionType, CancelReply, CancelRequest, CancelResponse, CancelReturnCode, GoalId, GoalInfo,
    GoalReply, GoalRequest, GoalResponse, GoalStatus, GoalStatusArray, GoalStatusEntry,
    RequestId, ResultReply, ResultRequest,
};

#[cfg(test)]
mod tests;
