// SPDX-License-Identifier: MIT

//! relay-rs: supervisor-routed multi-worker workflows
//!
//! - [`adk`] holds the contracts a workflow is built from: workers, the
//!   narrative model and the error types.
//! - [`relay`] holds the orchestration core, the data sources, the five
//!   reference workflows and the CLI/HTTP invocation surface.

pub mod adk;
pub mod relay;
