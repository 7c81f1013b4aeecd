// SPDX-License-Identifier: MIT

//! Credit underwriting: score tier, debt-to-income, decision

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::adk::error::WorkerFailure;
use crate::adk::worker::{StateView, Worker, WorkerResult};
use crate::relay::workflow::builder::GraphBuilder;
use crate::relay::workflow::state::{FieldType, StateSchema};
use crate::relay::workflow::supervisor::RouteTable;

pub const NAME: &str = "credit_underwriting";

worker_ids! {
    /// Workers of the credit underwriting workflow
    pub enum Step {
        CreditScore => "credit_score",
        Dti => "dti",
        Decision => "decision",
    }
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .optional_input("applicant_id", FieldType::String)
        .input("credit_score", FieldType::Integer)
        .input("income", FieldType::Number)
        .input("debt", FieldType::Number)
        .optional_input("employment_years", FieldType::Integer)
        .output("credit_tier", FieldType::String)
        .output("dti_ratio", FieldType::Number)
        .output("decision", FieldType::String)
}

pub fn route_table() -> RouteTable<Step> {
    RouteTable::new(NAME)
        .when_unset("credit_tier", Step::CreditScore)
        .when_unset("dti_ratio", Step::Dti)
        .when_unset("decision", Step::Decision)
}

pub fn builder() -> GraphBuilder<Step> {
    GraphBuilder::new(NAME, schema())
        .routes(route_table())
        .worker(Step::CreditScore, Arc::new(CreditScoreWorker))
        .worker(Step::Dti, Arc::new(DtiWorker))
        .worker(Step::Decision, Arc::new(DecisionWorker))
}

/// excellent ≥ 750, good ≥ 700, fair ≥ 650, else poor
pub fn credit_tier(score: i64) -> &'static str {
    match score {
        s if s >= 750 => "excellent",
        s if s >= 700 => "good",
        s if s >= 650 => "fair",
        _ => "poor",
    }
}

/// Debt as a percentage of income; 100 when there is no income
pub fn dti_ratio(debt: f64, income: f64) -> f64 {
    if income > 0.0 {
        debt * 100.0 / income
    } else {
        100.0
    }
}

pub fn dti_status(dti: f64) -> &'static str {
    if dti < 36.0 {
        "acceptable"
    } else if dti < 43.0 {
        "borderline"
    } else {
        "high"
    }
}

pub fn decide(score: i64, dti: f64) -> &'static str {
    if score >= 700 && dti < 36.0 {
        "APPROVED"
    } else if score >= 650 && dti < 43.0 {
        "APPROVED_WITH_CONDITIONS"
    } else {
        "DENIED"
    }
}

pub struct CreditScoreWorker;

#[async_trait]
impl Worker for CreditScoreWorker {
    fn name(&self) -> &str {
        "credit_score"
    }

    fn reads(&self) -> &[&'static str] {
        &["credit_score"]
    }

    fn writes(&self) -> &[&'static str] {
        &["credit_tier"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let score = state.require_i64("credit_score")?;
        let tier = credit_tier(score);
        Ok(
            WorkerResult::new(format!("Credit Score: {} ({})", score, tier.to_uppercase()))
                .with_field("credit_tier", json!(tier)),
        )
    }
}

pub struct DtiWorker;

#[async_trait]
impl Worker for DtiWorker {
    fn name(&self) -> &str {
        "dti"
    }

    fn reads(&self) -> &[&'static str] {
        &["income", "debt"]
    }

    fn writes(&self) -> &[&'static str] {
        &["dti_ratio"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let dti = dti_ratio(state.require_f64("debt")?, state.require_f64("income")?);
        Ok(WorkerResult::new(format!(
            "Debt-to-Income: {:.1}% ({})",
            dti,
            dti_status(dti).to_uppercase()
        ))
        .with_field("dti_ratio", json!(dti)))
    }
}

pub struct DecisionWorker;

#[async_trait]
impl Worker for DecisionWorker {
    fn name(&self) -> &str {
        "decision"
    }

    fn reads(&self) -> &[&'static str] {
        &["credit_score", "dti_ratio"]
    }

    fn writes(&self) -> &[&'static str] {
        &["decision"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let decision = decide(
            state.require_i64("credit_score")?,
            state.require_f64("dti_ratio")?,
        );
        Ok(WorkerResult::new(format!("Decision: {}", decision))
            .with_field("decision", json!(decision)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::workflow::graph::WorkerId;

    #[test]
    fn test_credit_tier_bands() {
        assert_eq!(credit_tier(800), "excellent");
        assert_eq!(credit_tier(750), "excellent");
        assert_eq!(credit_tier(749), "good");
        assert_eq!(credit_tier(700), "good");
        assert_eq!(credit_tier(650), "fair");
        assert_eq!(credit_tier(649), "poor");
    }

    #[test]
    fn test_dti() {
        assert_eq!(dti_ratio(1500.0, 5000.0), 30.0);
        assert_eq!(dti_ratio(1680.0, 4000.0), 42.0);
        assert_eq!(dti_ratio(10.0, 0.0), 100.0);
        assert_eq!(dti_ratio(10.0, -5.0), 100.0);
        assert_eq!(dti_status(35.9), "acceptable");
        assert_eq!(dti_status(36.0), "borderline");
        assert_eq!(dti_status(43.0), "high");
    }

    #[test]
    fn test_decision_rules() {
        assert_eq!(decide(720, 30.0), "APPROVED");
        assert_eq!(decide(700, 36.0), "APPROVED_WITH_CONDITIONS");
        assert_eq!(decide(660, 42.0), "APPROVED_WITH_CONDITIONS");
        assert_eq!(decide(800, 43.0), "DENIED");
        assert_eq!(decide(640, 10.0), "DENIED");
    }

    #[test]
    fn test_step_names() {
        assert_eq!(Step::parse("dti"), Some(Step::Dti));
        assert_eq!(Step::Decision.to_string(), "decision");
    }

    #[test]
    fn test_builder_validates() {
        assert!(builder().build().is_ok());
    }
}
