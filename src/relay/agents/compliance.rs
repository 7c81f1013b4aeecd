// SPDX-License-Identifier: MIT

//! Compliance monitoring: watchlist screening, policy validation, alerts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::format_money;
use crate::adk::error::WorkerFailure;
use crate::adk::worker::{StateView, Worker, WorkerResult};
use crate::relay::sources::{Sources, WatchlistSource};
use crate::relay::workflow::builder::GraphBuilder;
use crate::relay::workflow::state::{FieldType, StateSchema};
use crate::relay::workflow::supervisor::RouteTable;

pub const NAME: &str = "compliance_monitoring";

/// Above this amount AML applies and a currency transaction report is due
pub const AML_THRESHOLD: f64 = 10_000.0;
/// Above this amount enhanced due diligence is required
pub const EDD_THRESHOLD: f64 = 50_000.0;
/// Above this amount management must approve
pub const APPROVAL_THRESHOLD: f64 = 100_000.0;

pub const ACTION_BLOCK: &str = "BLOCK TRANSACTION";
pub const ACTION_CONDITIONAL: &str = "APPROVE WITH CONDITIONS";
pub const ACTION_APPROVE: &str = "APPROVE";

worker_ids! {
    /// Workers of the compliance monitoring workflow
    pub enum Step {
        WatchlistScreening => "watchlist_screening",
        PolicyValidation => "policy_validation",
        Alert => "alert",
    }
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .optional_input("transaction_id", FieldType::String)
        .input("entity_name", FieldType::String)
        .input("amount", FieldType::Number)
        .output("watchlist_result", FieldType::Object)
        .output("policy_result", FieldType::Object)
        .output("alert_generated", FieldType::Boolean)
        .output("alerts", FieldType::Array)
        .output("recommended_action", FieldType::String)
}

pub fn route_table() -> RouteTable<Step> {
    RouteTable::new(NAME)
        .when_unset("watchlist_result", Step::WatchlistScreening)
        .when_unset("policy_result", Step::PolicyValidation)
        .when_unset("alert_generated", Step::Alert)
}

pub fn builder(sources: &Sources) -> GraphBuilder<Step> {
    GraphBuilder::new(NAME, schema())
        .routes(route_table())
        .worker(
            Step::WatchlistScreening,
            Arc::new(WatchlistScreeningWorker {
                watchlist: sources.watchlist.clone(),
            }),
        )
        .worker(Step::PolicyValidation, Arc::new(PolicyValidationWorker))
        .worker(Step::Alert, Arc::new(AlertWorker))
}

/// Policy checks for a transaction amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyResult {
    pub kyc_complete: bool,
    pub aml_threshold_exceeded: bool,
    /// Currency transaction report
    pub ctr_required: bool,
    pub enhanced_dd_required: bool,
    pub approval_required: bool,
    pub policy_violations: Vec<String>,
}

impl PolicyResult {
    pub fn evaluate(amount: f64) -> Self {
        let aml = amount > AML_THRESHOLD;
        let mut policy_violations = Vec::new();
        if aml {
            policy_violations.push("AML threshold exceeded - CTR required".to_string());
        }
        Self {
            kyc_complete: true,
            aml_threshold_exceeded: aml,
            ctr_required: aml,
            enhanced_dd_required: amount > EDD_THRESHOLD,
            approval_required: amount > APPROVAL_THRESHOLD,
            policy_violations,
        }
    }
}

/// Alerts implied by screening and policy results, most severe first
///
/// Both results are read leniently: a caller may pre-populate either with a
/// partial object, and missing flags count as false.
pub fn alerts_for(watchlist: &Value, policy: &Value) -> Vec<String> {
    let flag = |v: &Value, key: &str| v.get(key).and_then(Value::as_bool).unwrap_or(false);

    let mut alerts = Vec::new();
    if flag(watchlist, "ofac_match") || flag(watchlist, "sanctions_match") {
        alerts.push("CRITICAL: Watchlist match - transaction blocked".to_string());
    }
    if flag(policy, "approval_required") {
        alerts.push("HIGH: Management approval required".to_string());
    }
    if flag(policy, "ctr_required") {
        alerts.push("MEDIUM: CTR filing required".to_string());
    }
    alerts
}

pub fn recommended_action(alerts: &[String]) -> &'static str {
    if alerts.iter().any(|a| a.starts_with("CRITICAL")) {
        ACTION_BLOCK
    } else if !alerts.is_empty() {
        ACTION_CONDITIONAL
    } else {
        ACTION_APPROVE
    }
}

fn yes_no(flag: bool, yes: &str) -> String {
    if flag {
        yes.to_string()
    } else {
        "No".to_string()
    }
}

pub struct WatchlistScreeningWorker {
    watchlist: Arc<dyn WatchlistSource>,
}

#[async_trait]
impl Worker for WatchlistScreeningWorker {
    fn name(&self) -> &str {
        "watchlist_screening"
    }

    fn reads(&self) -> &[&'static str] {
        &["entity_name"]
    }

    fn writes(&self) -> &[&'static str] {
        &["watchlist_result"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let entity = state.require_str("entity_name")?;
        let result = self.watchlist.screen(entity).await?;

        let summary = format!(
            "Watchlist Screening Results:\n\
             Entity: {}\n\
             OFAC Match: {}\n\
             Sanctions Match: {}\n\
             PEP Match: {}\n\
             Risk Score: {:.2}\n\
             Status: {}",
            result.entity,
            yes_no(result.ofac_match, "YES - BLOCKED"),
            yes_no(result.sanctions_match, "YES - BLOCKED"),
            yes_no(result.pep_match, "YES - REVIEW REQUIRED"),
            result.risk_score,
            result.status.to_uppercase()
        );

        let value = serde_json::to_value(&result)
            .map_err(|e| WorkerFailure::new(format!("unserializable screening result: {}", e)))?;
        Ok(WorkerResult::new(summary).with_field("watchlist_result", value))
    }
}

pub struct PolicyValidationWorker;

#[async_trait]
impl Worker for PolicyValidationWorker {
    fn name(&self) -> &str {
        "policy_validation"
    }

    fn reads(&self) -> &[&'static str] {
        &["entity_name", "amount"]
    }

    fn writes(&self) -> &[&'static str] {
        &["policy_result"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let amount = state.require_f64("amount")?;
        let entity = state.require_str("entity_name")?;
        let result = PolicyResult::evaluate(amount);

        let required = |flag: bool| if flag { "Required" } else { "Not required" };
        let violations = if result.policy_violations.is_empty() {
            "None".to_string()
        } else {
            result
                .policy_violations
                .iter()
                .map(|v| format!("- {}", v))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let summary = format!(
            "Policy Validation Results:\n\
             Entity: {}\n\
             Transaction Amount: {}\n\
             KYC Complete: {}\n\
             AML Threshold Exceeded: {}\n\
             CTR Required: {}\n\
             Enhanced Due Diligence: {}\n\
             Management Approval: {}\n\
             Policy Violations: {}\n{}",
            entity,
            format_money(amount),
            if result.kyc_complete { "Yes" } else { "No - BLOCKED" },
            yes_no(result.aml_threshold_exceeded, "Yes"),
            yes_no(result.ctr_required, "Yes"),
            required(result.enhanced_dd_required),
            required(result.approval_required),
            result.policy_violations.len(),
            violations
        );

        let value = serde_json::to_value(&result)
            .map_err(|e| WorkerFailure::new(format!("unserializable policy result: {}", e)))?;
        Ok(WorkerResult::new(summary).with_field("policy_result", value))
    }
}

pub struct AlertWorker;

#[async_trait]
impl Worker for AlertWorker {
    fn name(&self) -> &str {
        "alert"
    }

    fn reads(&self) -> &[&'static str] {
        &["transaction_id", "watchlist_result", "policy_result"]
    }

    fn writes(&self) -> &[&'static str] {
        &["alert_generated", "alerts", "recommended_action"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let alerts = alerts_for(
            state.require("watchlist_result")?,
            state.require("policy_result")?,
        );
        let action = recommended_action(&alerts);

        let listing = if alerts.is_empty() {
            "No alerts generated - transaction approved".to_string()
        } else {
            let numbered: Vec<String> = alerts
                .iter()
                .enumerate()
                .map(|(i, a)| format!("{}. {}", i + 1, a))
                .collect();
            format!("ALERTS:\n{}", numbered.join("\n"))
        };
        let summary = format!(
            "Compliance Alert Summary:\n\
             Transaction ID: {}\n\
             Total Alerts: {}\n{}\n\
             Recommended Action: {}",
            state.get_str("transaction_id").unwrap_or("n/a"),
            alerts.len(),
            listing,
            action
        );

        Ok(WorkerResult::new(summary)
            .with_field("alert_generated", json!(!alerts.is_empty()))
            .with_field("alerts", json!(alerts))
            .with_field("recommended_action", json!(action)))
    }
}
