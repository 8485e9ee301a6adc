// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration for the action layer.
//!
//! Static defaults live here as constants. Each options struct has a
//! `Default` impl and a `from_env()` constructor that applies overrides:
//!
//! - `HDDS_ACTION_RESULT_TIMEOUT_MS`: how long terminal goals keep their
//!   result before expiring (default: 15 minutes)
//! - `HDDS_EXECUTOR_WAIT_TIMEOUT_MS`: upper bound for one executor wait
//!   (default: block until an entity is ready)
//!
//! ```bash
//! export HDDS_ACTION_RESULT_TIMEOUT_MS=60000
//! export HDDS_EXECUTOR_WAIT_TIMEOUT_MS=100
//! ```

use std::env;
use std::time::Duration;

pub const ENV_RESULT_TIMEOUT_MS: &str = "HDDS_ACTION_RESULT_TIMEOUT_MS";
pub const ENV_EXECUTOR_WAIT_TIMEOUT_MS: &str = "HDDS_EXECUTOR_WAIT_TIMEOUT_MS";

/// Default retention of terminal goal results (rcl_action default).
pub const DEFAULT_RESULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Service endpoints registered by one action server (goal, cancel, result).
pub const ACTION_SERVER_SERVICES: usize = 3;

/// Timers registered by one action server (result expiry).
pub const ACTION_SERVER_TIMERS: usize = 1;

/// Consecutive recoverable cycle failures before `Executor::spin` gives up.
pub const SPIN_MAX_RETRIES: u8 = 5;

/// First pause after a recoverable cycle failure (doubles on each retry).
pub const SPIN_INITIAL_BACKOFF_MS: u64 = 10;

/// Options for [`crate::action::ActionServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionServerOptions {
    /// Time a terminal goal keeps its result before it is removed.
    pub result_timeout: Duration,
}

impl Default for ActionServerOptions {
    fn default() -> Self {
        Self {
            result_timeout: DEFAULT_RESULT_TIMEOUT,
        }
    }
}

impl ActionServerOptions {
    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(timeout) = env_millis(ENV_RESULT_TIMEOUT_MS) {
            options.result_timeout = timeout;
        }
        options
    }

    #[must_use]
    pub fn with_result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout = timeout;
        self
    }
}

/// Options for [`crate::executor::Executor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Upper bound applied to each `spin()` wait. `None` blocks until ready.
    pub wait_timeout: Option<Duration>,
}

impl ExecutorOptions {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            wait_timeout: env_millis(ENV_EXECUTOR_WAIT_TIMEOUT_MS),
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    let raw = env::var(name).ok()?;
    match parse_millis(&raw) {
        Some(value) => Some(value),
        None => {
            log::warn!("[config] ignoring {}={:?}: expected milliseconds", name, raw);
            None
        }
    }
}

fn parse_millis(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_millis)
}
