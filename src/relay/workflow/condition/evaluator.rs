// SPDX-License-Identifier: MIT

//! Routing predicate evaluator

use super::ast::Predicate;
use crate::relay::workflow::state::WorkflowState;

/// Evaluate a predicate against workflow state
///
/// Pure: reads only the state passed in.
pub fn evaluate(predicate: &Predicate, state: &WorkflowState) -> bool {
    match predicate {
        Predicate::Unset(path) => !state.is_set(path),
        Predicate::TranscriptBelow(n) => state.transcript().len() < *n,
        Predicate::And(a, b) => evaluate(a, state) && evaluate(b, state),
        Predicate::Or(a, b) => evaluate(a, state) || evaluate(b, state),
        Predicate::Always => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::worker::WorkerResult;
    use crate::relay::workflow::condition::parse;
    use crate::relay::workflow::state::{FieldType, StateSchema};
    use serde_json::json;

    fn schema() -> StateSchema {
        StateSchema::new()
            .output("velocity_score", FieldType::Number)
            .output("details", FieldType::Object)
    }

    fn after_one_step() -> WorkflowState {
        WorkflowState::empty("r", "fraud")
            .apply(
                "velocity_check",
                &WorkerResult::new("velocity 0.3")
                    .with_field("velocity_score", json!(0.3))
                    .with_field("details", json!({"source": null})),
                &schema(),
            )
            .unwrap()
    }

    #[test]
    fn test_unset() {
        let empty = WorkflowState::empty("r", "fraud");
        assert!(evaluate(&parse("velocity_score is unset").unwrap(), &empty));
        assert!(!evaluate(
            &parse("velocity_score is unset").unwrap(),
            &after_one_step()
        ));
    }

    #[test]
    fn test_nested_null_counts_as_unset() {
        let state = after_one_step();
        assert!(evaluate(&parse("details.source is unset").unwrap(), &state));
        assert!(!evaluate(&parse("details is unset").unwrap(), &state));
    }

    #[test]
    fn test_transcript_threshold() {
        let empty = WorkflowState::empty("r", "fraud");
        let one = after_one_step();
        let below_one = parse("transcript < 1").unwrap();
        assert!(evaluate(&below_one, &empty));
        assert!(!evaluate(&below_one, &one));
        assert!(evaluate(&parse("transcript < 2").unwrap(), &one));
        assert!(!evaluate(&parse("transcript < 0").unwrap(), &empty));
    }

    #[test]
    fn test_logical_operators() {
        let state = after_one_step();
        assert!(!evaluate(
            &parse("velocity_score is unset and always").unwrap(),
            &state
        ));
        assert!(evaluate(
            &parse("velocity_score is unset or transcript < 2").unwrap(),
            &state
        ));
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let state = after_one_step();
        let predicate = parse("details.source is unset and transcript < 5").unwrap();
        let first = evaluate(&predicate, &state);
        for _ in 0..10 {
            assert_eq!(evaluate(&predicate, &state), first);
        }
    }
}
