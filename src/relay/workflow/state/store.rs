// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::schema::StateSchema;
use crate::adk::error::{RunError, WorkflowError};
use crate::adk::worker::WorkerResult;

/// Provenance recorded for fields supplied by the caller
pub const INPUT_WRITER: &str = "input";

/// One transcript entry, produced by exactly one worker invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the run
    pub seq: usize,
    pub worker: String,
    pub summary: String,
    pub at: DateTime<Utc>,
}

/// Runtime workflow state
///
/// Business fields are write-once: a field is unset until exactly one writer
/// (the caller or a worker) sets it, and is never cleared afterwards. Updates
/// are applied functionally through [`WorkflowState::apply`], which returns the
/// next state and leaves the current one untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    run_id: String,
    workflow: String,
    fields: BTreeMap<String, Value>,
    written_by: BTreeMap<String, String>,
    transcript: Vec<StepRecord>,
    step_count: usize,
}

impl WorkflowState {
    /// Create the initial state of a run, validating inputs against the schema
    ///
    /// `null` values are treated as unset and dropped.
    pub fn new(
        run_id: impl Into<String>,
        workflow: impl Into<String>,
        schema: &StateSchema,
        inputs: Map<String, Value>,
    ) -> Result<Self, WorkflowError> {
        let mut state = Self::empty(run_id, workflow);

        for (key, value) in inputs {
            if value.is_null() {
                continue;
            }
            let def = schema
                .get(&key)
                .ok_or_else(|| WorkflowError::UnknownField(key.clone()))?;
            if !def.field_type.matches(&value) {
                return Err(WorkflowError::TypeMismatch {
                    field: key,
                    expected: def.field_type.to_string(),
                });
            }
            state.written_by.insert(key.clone(), INPUT_WRITER.to_string());
            state.fields.insert(key, value);
        }

        if let Some(missing) = schema.required_inputs().find(|name| !state.is_set(name)) {
            return Err(WorkflowError::MissingInput(missing.to_string()));
        }

        Ok(state)
    }

    /// Create an empty state without schema validation
    pub fn empty(run_id: impl Into<String>, workflow: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            workflow: workflow.into(),
            fields: BTreeMap::new(),
            written_by: BTreeMap::new(),
            transcript: Vec::new(),
            step_count: 0,
        }
    }

    /// Produce the next state by merging a worker's result
    ///
    /// Fails without producing a state when the result clears a field, writes
    /// a field outside the schema or of the wrong type, or overwrites a field
    /// that is already set.
    pub fn apply(
        &self,
        worker: &str,
        result: &WorkerResult,
        schema: &StateSchema,
    ) -> Result<WorkflowState, RunError> {
        let mut next = self.clone();

        for (key, value) in &result.fields {
            if value.is_null() {
                return Err(RunError::routing(format!(
                    "worker '{}' attempted to clear field '{}'",
                    worker, key
                )));
            }
            let def = schema.get(key).ok_or_else(|| {
                RunError::routing(format!(
                    "worker '{}' wrote field '{}' which is not in the schema",
                    worker, key
                ))
            })?;
            if !def.field_type.matches(value) {
                return Err(RunError::routing(format!(
                    "worker '{}' wrote field '{}' with a non-{} value",
                    worker, key, def.field_type
                )));
            }
            if let Some(previous) = next.written_by.get(key) {
                return Err(RunError::routing(format!(
                    "field '{}' already set by '{}'; worker '{}' attempted to overwrite it",
                    key, previous, worker
                )));
            }
            next.written_by.insert(key.clone(), worker.to_string());
            next.fields.insert(key.clone(), value.clone());
        }

        next.step_count += 1;
        next.transcript.push(StepRecord {
            seq: next.step_count,
            worker: worker.to_string(),
            summary: result.summary.clone(),
            at: Utc::now(),
        });

        Ok(next)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Name of the workflow this state belongs to
    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value using dot notation (e.g., "market_data.price")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Whether a field (or nested path) holds a non-null value
    pub fn is_set(&self, path: &str) -> bool {
        self.get_path(path).is_some_and(|v| !v.is_null())
    }

    /// Who wrote a field: a worker name or [`INPUT_WRITER`]
    pub fn written_by(&self, key: &str) -> Option<&str> {
        self.written_by.get(key).map(|s| s.as_str())
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn transcript(&self) -> &[StepRecord] {
        &self.transcript
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Convert business fields to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::workflow::state::FieldType;
    use serde_json::json;

    fn schema() -> StateSchema {
        StateSchema::new()
            .input("income", FieldType::Number)
            .optional_input("applicant_id", FieldType::String)
            .output("dti_ratio", FieldType::Number)
            .output("decision", FieldType::String)
            .output("details", FieldType::Object)
    }

    fn inputs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_validates_inputs() {
        let state = WorkflowState::new("r1", "credit", &schema(), inputs(json!({"income": 5000})))
            .unwrap();
        assert_eq!(state.get("income"), Some(&json!(5000)));
        assert_eq!(state.written_by("income"), Some(INPUT_WRITER));
        assert_eq!(state.step_count(), 0);
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn test_new_rejects_missing_required_input() {
        let err = WorkflowState::new("r1", "credit", &schema(), Map::new()).unwrap_err();
        assert_eq!(err, WorkflowError::MissingInput("income".to_string()));
    }

    #[test]
    fn test_new_rejects_unknown_field() {
        let err = WorkflowState::new(
            "r1",
            "credit",
            &schema(),
            inputs(json!({"income": 1, "shoe_size": 44})),
        )
        .unwrap_err();
        assert_eq!(err, WorkflowError::UnknownField("shoe_size".to_string()));
    }

    #[test]
    fn test_new_rejects_type_mismatch() {
        let err = WorkflowState::new("r1", "credit", &schema(), inputs(json!({"income": "lots"})))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::TypeMismatch {
                field: "income".to_string(),
                expected: "number".to_string(),
            }
        );
    }

    #[test]
    fn test_null_inputs_are_unset() {
        let state = WorkflowState::new(
            "r1",
            "credit",
            &schema(),
            inputs(json!({"income": 1, "decision": null})),
        )
        .unwrap();
        assert!(!state.is_set("decision"));
        assert!(state.get("decision").is_none());
    }

    #[test]
    fn test_apply_is_functional() {
        let state = WorkflowState::new("r1", "credit", &schema(), inputs(json!({"income": 1})))
            .unwrap();
        let result = WorkerResult::new("DTI computed").with_field("dti_ratio", json!(30.0));

        let next = state.apply("dti", &result, &schema()).unwrap();

        assert!(!state.is_set("dti_ratio"));
        assert_eq!(state.step_count(), 0);
        assert_eq!(next.get("dti_ratio"), Some(&json!(30.0)));
        assert_eq!(next.written_by("dti_ratio"), Some("dti"));
        assert_eq!(next.step_count(), 1);
        assert_eq!(next.transcript().len(), 1);
        assert_eq!(next.transcript()[0].seq, 1);
        assert_eq!(next.transcript()[0].worker, "dti");
        assert_eq!(next.transcript()[0].summary, "DTI computed");
    }

    #[test]
    fn test_apply_rejects_overwrite() {
        let state = WorkflowState::new("r1", "credit", &schema(), inputs(json!({"income": 1})))
            .unwrap();
        let first = WorkerResult::new("one").with_field("decision", json!("APPROVED"));
        let second = WorkerResult::new("two").with_field("decision", json!("DENIED"));

        let next = state.apply("decision", &first, &schema()).unwrap();
        let err = next.apply("appeal", &second, &schema()).unwrap_err();

        match err {
            RunError::RoutingConfig(msg) => {
                assert!(msg.contains("already set by 'decision'"));
                assert!(msg.contains("'appeal'"));
            }
            other => panic!("Expected RoutingConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_rejects_overwriting_an_input() {
        let state = WorkflowState::new("r1", "credit", &schema(), inputs(json!({"income": 1})))
            .unwrap();
        let result = WorkerResult::new("sneaky").with_field("income", json!(2));
        assert!(matches!(
            state.apply("dti", &result, &schema()),
            Err(RunError::RoutingConfig(_))
        ));
    }

    #[test]
    fn test_apply_rejects_clear_and_bad_types() {
        let state = WorkflowState::empty("r1", "credit");

        let clear = WorkerResult::new("clear").with_field("decision", Value::Null);
        assert!(matches!(
            state.apply("x", &clear, &schema()),
            Err(RunError::RoutingConfig(_))
        ));

        let wrong = WorkerResult::new("wrong").with_field("dti_ratio", json!("high"));
        assert!(matches!(
            state.apply("x", &wrong, &schema()),
            Err(RunError::RoutingConfig(_))
        ));

        let unknown = WorkerResult::new("unknown").with_field("mood", json!("good"));
        assert!(matches!(
            state.apply("x", &unknown, &schema()),
            Err(RunError::RoutingConfig(_))
        ));
    }

    #[test]
    fn test_get_path() {
        let state = WorkflowState::empty("r1", "credit")
            .apply(
                "w",
                &WorkerResult::new("s").with_field("details", json!({"data": {"value": 42}})),
                &schema(),
            )
            .unwrap();

        assert_eq!(state.get_path("details.data"), Some(&json!({"value": 42})));
        assert_eq!(state.get_path("details.data.value"), Some(&json!(42)));
        assert_eq!(state.get_path("details.nonexistent"), None);
        assert!(state.is_set("details.data.value"));
    }

    #[test]
    fn test_serde_roundtrip_preserves_continuity() {
        let state = WorkflowState::new("r1", "credit", &schema(), inputs(json!({"income": 1})))
            .unwrap()
            .apply(
                "dti",
                &WorkerResult::new("s").with_field("dti_ratio", json!(12.5)),
                &schema(),
            )
            .unwrap();

        let text = serde_json::to_string(&state).unwrap();
        let restored: WorkflowState = serde_json::from_str(&text).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.step_count(), restored.transcript().len());
    }
}
