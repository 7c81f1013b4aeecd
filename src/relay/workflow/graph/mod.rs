// SPDX-License-Identifier: MIT

//! Supervisor-routed graph execution
//!
//! This module provides the runner that alternates supervisor decisions and
//! worker executions over a shared, write-once state.

pub mod executor;
pub mod types;

pub use executor::{GraphRunner, DEFAULT_MAX_STEPS};
pub use types::{RunEvent, RunOutcome, RunStatus, WorkerId};
