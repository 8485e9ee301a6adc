// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime primitives for blocking waits.
//!
//! Provides `WaitDriver`, the wake primitive a `WaitSet` blocks on and that
//! its registered entities signal when they become ready.

mod driver;

pub use driver::WaitDriver;
