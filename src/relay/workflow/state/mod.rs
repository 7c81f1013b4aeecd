// SPDX-License-Identifier: MIT

//! State management for supervised workflows
//!
//! This module provides:
//! - `StateSchema` - declares the inputs and write-once outputs of a workflow
//! - `WorkflowState` - the per-run record threaded through every step
//! - `StepRecord` - one transcript entry per worker invocation

mod schema;
mod store;

pub use schema::{FieldDef, FieldRole, FieldType, StateSchema};
pub use store::{StepRecord, WorkflowState, INPUT_WRITER};
