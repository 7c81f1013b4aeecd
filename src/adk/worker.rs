// SPDX-License-Identifier: MIT

//! Worker module - the unit of business computation in a workflow
//!
//! A worker reads the fields it declares, returns a partial update plus a
//! transcript summary, and never decides what runs next.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::adk::error::WorkerFailure;
use crate::relay::workflow::state::{StepRecord, WorkflowState};

/// Partial state update produced by a worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerResult {
    pub fields: Map<String, Value>,
    pub summary: String,
}

impl WorkerResult {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            fields: Map::new(),
            summary: summary.into(),
        }
    }

    /// Add a field to the update
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

/// Read-only projection of the state limited to a worker's declared reads
///
/// Fields outside the declared set behave as absent. Run identity and the
/// transcript are always visible.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a WorkflowState,
    reads: &'a [&'static str],
}

impl<'a> StateView<'a> {
    pub fn new(state: &'a WorkflowState, reads: &'a [&'static str]) -> Self {
        Self { state, reads }
    }

    pub fn run_id(&self) -> &'a str {
        self.state.run_id()
    }

    /// Get a declared field, `None` when unset or undeclared
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        if !self.reads.contains(&key) {
            log::debug!("Worker read undeclared field '{}'", key);
            return None;
        }
        self.state.get(key).filter(|v| !v.is_null())
    }

    pub fn require(&self, key: &str) -> Result<&'a Value, WorkerFailure> {
        self.get(key).ok_or_else(|| WorkerFailure::missing(key))
    }

    pub fn require_str(&self, key: &str) -> Result<&'a str, WorkerFailure> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| WorkerFailure::new(format!("field '{}' is not a string", key)))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, WorkerFailure> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| WorkerFailure::new(format!("field '{}' is not a number", key)))
    }

    pub fn require_i64(&self, key: &str) -> Result<i64, WorkerFailure> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| WorkerFailure::new(format!("field '{}' is not an integer", key)))
    }

    pub fn require_bool(&self, key: &str) -> Result<bool, WorkerFailure> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| WorkerFailure::new(format!("field '{}' is not a boolean", key)))
    }

    /// Optional string field
    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn transcript(&self) -> &'a [StepRecord] {
        self.state.transcript()
    }
}

/// Core worker trait
#[async_trait]
pub trait Worker: Send + Sync {
    /// Returns the worker name; must equal the id it is registered under
    fn name(&self) -> &str;

    /// Fields the worker may read
    fn reads(&self) -> &[&'static str];

    /// Fields the worker may write
    fn writes(&self) -> &[&'static str];

    /// Compute the update for the given state
    ///
    /// Must be idempotent for identical input state.
    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::workflow::state::{FieldType, StateSchema};
    use serde_json::json;

    /// A simple worker that doubles a number (used in tests)
    struct DoublingWorker;

    #[async_trait]
    impl Worker for DoublingWorker {
        fn name(&self) -> &str {
            "double"
        }

        fn reads(&self) -> &[&'static str] {
            &["x"]
        }

        fn writes(&self) -> &[&'static str] {
            &["doubled"]
        }

        async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
            let x = state.require_f64("x")?;
            Ok(WorkerResult::new(format!("doubled {}", x)).with_field("doubled", json!(x * 2.0)))
        }
    }

    fn state(inputs: Value) -> WorkflowState {
        let schema = StateSchema::new()
            .optional_input("x", FieldType::Number)
            .optional_input("secret", FieldType::String)
            .output("doubled", FieldType::Number);
        WorkflowState::new("r", "test", &schema, inputs.as_object().cloned().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_worker_reads_declared_field() {
        let worker = DoublingWorker;
        let state = state(json!({"x": 21}));
        let result = worker
            .execute(StateView::new(&state, worker.reads()))
            .await
            .unwrap();
        assert_eq!(result.fields.get("doubled"), Some(&json!(42.0)));
        assert_eq!(result.summary, "doubled 21");
    }

    #[tokio::test]
    async fn test_missing_input_is_worker_failure() {
        let worker = DoublingWorker;
        let state = state(json!({}));
        let err = worker
            .execute(StateView::new(&state, worker.reads()))
            .await
            .unwrap_err();
        assert_eq!(err, WorkerFailure::missing("x"));
    }

    #[test]
    fn test_view_hides_undeclared_fields() {
        let state = state(json!({"x": 1, "secret": "hunter2"}));
        let view = StateView::new(&state, &["x"]);
        assert!(view.get("x").is_some());
        assert!(view.get("secret").is_none());
        assert!(view.require_str("secret").is_err());
    }

    #[test]
    fn test_view_type_errors() {
        let state = state(json!({"x": 1.5}));
        let view = StateView::new(&state, &["x"]);
        assert_eq!(view.require_f64("x").unwrap(), 1.5);
        assert!(view.require_i64("x").is_err());
        assert!(view.require_str("x").is_err());
    }
}
