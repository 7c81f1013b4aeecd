// SPDX-License-Identifier: MIT

//! Typed error handling for relay-rs
//!
//! Errors are split by where they arise:
//! - `WorkflowError` - construction and configuration problems found before a run starts
//! - `RunError` - run-fatal faults raised by the orchestrator loop
//! - `WorkerFailure` - a worker could not produce its result
//! - `ModelError` / `SourceError` - failures of external collaborators
//!
//! `RelayError` wraps all of them for callers of the invocation surface.

use thiserror::Error;

use crate::relay::workflow::state::WorkflowState;

/// Top-level error type for relay-rs
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (invalid env vars, bad CLI values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow construction or input errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Narrative model errors outside of a run
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Data source errors outside of a run
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Checkpoint store errors outside of a run
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A run terminated with a fault; carries the last committed state
    #[error("Run fault: {0}")]
    Fault(Box<RunFault>),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl RelayError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }

    /// The fault carried by this error, if it came from a run
    pub fn fault(&self) -> Option<&RunFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<RunFault> for RelayError {
    fn from(fault: RunFault) -> Self {
        Self::Fault(Box::new(fault))
    }
}

/// Errors detected while building a workflow or its initial state
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkflowError {
    /// Workflow name not in the catalog
    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    /// A route table names a worker the workflow does not define
    #[error("Unknown worker '{worker}' in workflow '{workflow}'")]
    UnknownWorker { workflow: String, worker: String },

    /// A route targets a worker with no registered implementation
    #[error("Worker '{0}' is routed to but not registered")]
    UnregisteredWorker(String),

    /// A supervisor with no routes would terminate before doing anything
    #[error("Route table for '{0}' has no routes")]
    EmptyRouteTable(String),

    /// A worker's declared reads or writes do not fit the workflow schema
    #[error("Worker '{worker}' is misconfigured: {reason}")]
    InvalidWorker { worker: String, reason: String },

    /// A routing predicate could not be parsed
    #[error("Invalid predicate '{input}': {reason}")]
    InvalidPredicate { input: String, reason: String },

    /// A required input field was not supplied
    #[error("Missing required input '{0}'")]
    MissingInput(String),

    /// A supplied field is not part of the workflow schema
    #[error("Field '{0}' is not part of the workflow schema")]
    UnknownField(String),

    /// A supplied field has the wrong JSON type
    #[error("Field '{field}' must be of type {expected}")]
    TypeMismatch { field: String, expected: String },

    /// No checkpoint exists for the run being resumed
    #[error("No checkpoint found for run '{0}'")]
    CheckpointNotFound(String),
}

impl WorkflowError {
    /// Create an invalid worker error
    pub fn invalid_worker(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidWorker {
            worker: worker.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid predicate error
    pub fn invalid_predicate(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPredicate {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Run-fatal faults raised by the orchestrator
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RunError {
    /// A worker could not proceed
    #[error("Worker '{worker}' failed: {reason}")]
    WorkerFailure { worker: String, reason: String },

    /// The supervisor named a worker that is not registered
    #[error("Supervisor routed to unknown worker '{0}'")]
    UnknownWorker(String),

    /// The routing table or a worker's declared I/O is inconsistent
    #[error("Routing configuration error: {0}")]
    RoutingConfig(String),

    /// More steps were requested than the budget allows
    #[error("Step budget of {max_steps} exceeded")]
    StepBudgetExceeded { max_steps: usize },

    /// Saving the committed state failed
    #[error("Checkpoint failed: {0}")]
    Checkpoint(String),
}

impl RunError {
    /// Create a routing config error
    pub fn routing(message: impl Into<String>) -> Self {
        Self::RoutingConfig(message.into())
    }
}

/// A fault together with the last fully merged state of the run
#[derive(Debug, Error, Clone)]
#[error("{error} (after {} steps)", .state.step_count())]
pub struct RunFault {
    pub error: RunError,
    pub state: WorkflowState,
}

/// Failure reported by a worker
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{reason}")]
pub struct WorkerFailure {
    pub reason: String,
}

impl WorkerFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// A required input field was absent from the worker's view
    pub fn missing(field: &str) -> Self {
        Self::new(format!("required field '{}' is absent", field))
    }
}

impl From<ModelError> for WorkerFailure {
    fn from(err: ModelError) -> Self {
        Self::new(format!("narrative model: {}", err))
    }
}

impl From<SourceError> for WorkerFailure {
    fn from(err: SourceError) -> Self {
        Self::new(format!("data source: {}", err))
    }
}

/// Narrative model errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// The request did not complete in time
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success response from the provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Data source errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    /// The source has no record for the requested key
    #[error("{source_name} has no data for '{key}'")]
    NotFound { source_name: String, key: String },

    /// The source could not be reached
    #[error("{source_name} unavailable: {message}")]
    Unavailable {
        source_name: String,
        message: String,
    },
}

impl SourceError {
    pub fn not_found(source_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            source_name: source_name.into(),
            key: key.into(),
        }
    }

    pub fn unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
