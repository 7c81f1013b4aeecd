// SPDX-License-Identifier: MIT

//! Graph type definitions
//!
//! Routing targets are closed enums: each workflow lists its workers once and
//! every route table, registry and transcript entry refers to that list.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;

use crate::adk::error::RunError;
use crate::relay::workflow::state::WorkflowState;

/// Typed identifier of a workflow's worker
pub trait WorkerId: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {
    /// Every worker of the workflow, in routing order
    fn all() -> &'static [Self];

    /// Name recorded in the transcript
    fn as_str(&self) -> &'static str;

    /// Resolve a worker name from a route table definition
    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|id| id.as_str() == name)
    }
}

/// Terminal status of a run that did not fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The supervisor returned Terminate
    Completed,
    /// Cancellation was observed between steps
    Cancelled,
}

/// Final state of a run together with how it ended
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub state: WorkflowState,
}

/// Progress notifications published while a run executes
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A worker is about to execute
    StepStarted {
        run_id: String,
        step: usize,
        worker: String,
    },
    /// A worker's result was merged
    StepCompleted {
        run_id: String,
        step: usize,
        worker: String,
        summary: String,
    },
    /// The run ended without a fault
    Finished {
        run_id: String,
        status: RunStatus,
        steps: usize,
    },
    /// The run ended with a fault
    Faulted {
        run_id: String,
        error: String,
        steps: usize,
    },
}

impl RunEvent {
    pub(crate) fn faulted(run_id: &str, error: &RunError, state: &WorkflowState) -> Self {
        RunEvent::Faulted {
            run_id: run_id.to_string(),
            error: error.to_string(),
            steps: state.step_count(),
        }
    }
}
