// SPDX-License-Identifier: MIT

//! Portfolio management: market regime, valuation, rebalancing advice

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::format_money;
use crate::adk::error::WorkerFailure;
use crate::adk::worker::{StateView, Worker, WorkerResult};
use crate::relay::sources::{MarketDataSource, Sources};
use crate::relay::workflow::builder::GraphBuilder;
use crate::relay::workflow::state::{FieldType, StateSchema};
use crate::relay::workflow::supervisor::RouteTable;

pub const NAME: &str = "portfolio_management";

worker_ids! {
    /// Workers of the portfolio management workflow
    pub enum Step {
        MarketAnalysis => "market_analysis",
        PortfolioAnalysis => "portfolio_analysis",
        Rebalance => "rebalance",
    }
}

pub fn schema() -> StateSchema {
    StateSchema::new()
        .input("portfolio_id", FieldType::String)
        .input("holdings", FieldType::Array)
        .output("market_conditions", FieldType::String)
        .output("portfolio_value", FieldType::Number)
        .output("rebalance_needed", FieldType::Boolean)
        .output("recommendations", FieldType::Array)
}

pub fn route_table() -> RouteTable<Step> {
    RouteTable::new(NAME)
        .when_unset("market_conditions", Step::MarketAnalysis)
        .when_unset("portfolio_value", Step::PortfolioAnalysis)
        .when_unset("rebalance_needed", Step::Rebalance)
}

pub fn builder(sources: &Sources) -> GraphBuilder<Step> {
    GraphBuilder::new(NAME, schema())
        .routes(route_table())
        .worker(
            Step::MarketAnalysis,
            Arc::new(MarketAnalysisWorker {
                market: sources.market.clone(),
            }),
        )
        .worker(Step::PortfolioAnalysis, Arc::new(PortfolioAnalysisWorker))
        .worker(Step::Rebalance, Arc::new(RebalanceWorker))
}

/// Sum of holding values; holdings without a numeric `value` count as zero
pub fn total_value(holdings: &[serde_json::Value]) -> f64 {
    holdings
        .iter()
        .filter_map(|h| h.get("value").and_then(|v| v.as_f64()))
        .sum()
}

pub struct MarketAnalysisWorker {
    market: Arc<dyn MarketDataSource>,
}

#[async_trait]
impl Worker for MarketAnalysisWorker {
    fn name(&self) -> &str {
        "market_analysis"
    }

    fn reads(&self) -> &[&'static str] {
        &[]
    }

    fn writes(&self) -> &[&'static str] {
        &["market_conditions"]
    }

    async fn execute(&self, _state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let conditions = self.market.market_conditions().await?;
        Ok(
            WorkerResult::new(format!("Market Conditions: {}", conditions.to_uppercase()))
                .with_field("market_conditions", json!(conditions)),
        )
    }
}

pub struct PortfolioAnalysisWorker;

#[async_trait]
impl Worker for PortfolioAnalysisWorker {
    fn name(&self) -> &str {
        "portfolio_analysis"
    }

    fn reads(&self) -> &[&'static str] {
        &["holdings"]
    }

    fn writes(&self) -> &[&'static str] {
        &["portfolio_value"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        let holdings = state
            .require("holdings")?
            .as_array()
            .ok_or_else(|| WorkerFailure::new("field 'holdings' is not an array"))?;
        let value = total_value(holdings);

        Ok(
            WorkerResult::new(format!("Portfolio Value: {}", format_money(value)))
                .with_field("portfolio_value", json!(value)),
        )
    }
}

pub struct RebalanceWorker;

#[async_trait]
impl Worker for RebalanceWorker {
    fn name(&self) -> &str {
        "rebalance"
    }

    fn reads(&self) -> &[&'static str] {
        &["market_conditions", "portfolio_value"]
    }

    fn writes(&self) -> &[&'static str] {
        &["rebalance_needed", "recommendations"]
    }

    async fn execute(&self, state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
        state.require_str("market_conditions")?;
        state.require_f64("portfolio_value")?;

        // Advice is a fixed stub until a real allocation model exists.
        let recommendations = ["Increase tech allocation by 5%", "Reduce bonds by 3%"];
        let listing: Vec<String> = recommendations.iter().map(|r| format!("- {}", r)).collect();

        Ok(WorkerResult::new(format!(
            "Rebalance: NEEDED\nRecommendations:\n{}",
            listing.join("\n")
        ))
        .with_field("rebalance_needed", json!(true))
        .with_field("recommendations", json!(recommendations)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::workflow::state::WorkflowState;

    #[test]
    fn test_total_value() {
        let holdings = vec![
            json!({"symbol": "AAPL", "value": 10000.0}),
            json!({"symbol": "BND", "value": 2500.5}),
            json!({"symbol": "CASH"}),
        ];
        assert_eq!(total_value(&holdings), 12500.5);
        assert_eq!(total_value(&[]), 0.0);
    }

    #[test]
    fn test_builder_validates() {
        assert!(builder(&Sources::mock()).build().is_ok());
    }

    #[tokio::test]
    async fn test_analysis_summary() {
        let inputs = json!({
            "portfolio_id": "PF-1",
            "holdings": [{"symbol": "AAPL", "value": 10000.0}, {"symbol": "BND", "value": 2500.5}]
        });
        let state = WorkflowState::new(
            "r1",
            NAME,
            &schema(),
            inputs.as_object().cloned().unwrap(),
        )
        .unwrap();

        let worker = PortfolioAnalysisWorker;
        let result = worker
            .execute(StateView::new(&state, worker.reads()))
            .await
            .unwrap();
        assert_eq!(result.summary, "Portfolio Value: $12,500.50");
        assert_eq!(result.fields.get("portfolio_value"), Some(&json!(12500.5)));
    }
}
