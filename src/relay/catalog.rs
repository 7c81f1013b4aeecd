// SPDX-License-Identifier: MIT

//! Workflow catalog and runtime - the invocation surface shared by the CLI
//! and the HTTP server

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adk::error::{RelayError, WorkflowError};
use crate::adk::model::offline::OfflineModel;
use crate::adk::model::openai::OpenAIModel;
use crate::adk::model::Model;
use crate::relay::agents::{compliance, credit, financial, fraud, portfolio};
use crate::relay::config::RuntimeConfig;
use crate::relay::sources::Sources;
use crate::relay::workflow::builder::GraphBuilder;
use crate::relay::workflow::checkpoint::{CheckpointStore, FileCheckpointStore, RunSettings};
use crate::relay::workflow::graph::{GraphRunner, RunEvent, RunOutcome, RunStatus, WorkerId};
use crate::relay::workflow::state::WorkflowState;
use crate::relay::workflow::types::RouteTableDef;

/// The built-in workflows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    #[serde(alias = "financial-analysis")]
    FinancialAnalysis,
    #[serde(alias = "credit-underwriting")]
    CreditUnderwriting,
    #[serde(alias = "fraud-detection")]
    FraudDetection,
    #[serde(alias = "compliance-monitoring")]
    ComplianceMonitoring,
    #[serde(alias = "portfolio-management")]
    PortfolioManagement,
}

impl WorkflowKind {
    pub fn all() -> &'static [WorkflowKind] {
        &[
            WorkflowKind::FinancialAnalysis,
            WorkflowKind::CreditUnderwriting,
            WorkflowKind::FraudDetection,
            WorkflowKind::ComplianceMonitoring,
            WorkflowKind::PortfolioManagement,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::FinancialAnalysis => financial::NAME,
            WorkflowKind::CreditUnderwriting => credit::NAME,
            WorkflowKind::FraudDetection => fraud::NAME,
            WorkflowKind::ComplianceMonitoring => compliance::NAME,
            WorkflowKind::PortfolioManagement => portfolio::NAME,
        }
    }

    /// Field holding the workflow's final answer
    pub fn decision_field(&self) -> &'static str {
        match self {
            WorkflowKind::FinancialAnalysis => "final_report",
            WorkflowKind::CreditUnderwriting => "decision",
            WorkflowKind::FraudDetection => "fraud_detected",
            WorkflowKind::ComplianceMonitoring => "recommended_action",
            WorkflowKind::PortfolioManagement => "rebalance_needed",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WorkflowKind::FinancialAnalysis => {
                "Market data and news sentiment for a ticker, written up as an investment report"
            }
            WorkflowKind::CreditUnderwriting => {
                "Credit tier and debt-to-income ratio leading to a lending decision"
            }
            WorkflowKind::FraudDetection => {
                "Velocity, geolocation and device signals combined into a weighted risk score"
            }
            WorkflowKind::ComplianceMonitoring => {
                "Watchlist screening and policy checks producing alerts and a recommended action"
            }
            WorkflowKind::PortfolioManagement => {
                "Market regime and portfolio valuation producing rebalancing advice"
            }
        }
    }

    /// Worker names in routing order
    pub fn workers(&self) -> Vec<&'static str> {
        fn names<W: WorkerId>() -> Vec<&'static str> {
            W::all().iter().map(|id| id.as_str()).collect()
        }
        match self {
            WorkflowKind::FinancialAnalysis => names::<financial::Step>(),
            WorkflowKind::CreditUnderwriting => names::<credit::Step>(),
            WorkflowKind::FraudDetection => names::<fraud::Step>(),
            WorkflowKind::ComplianceMonitoring => names::<compliance::Step>(),
            WorkflowKind::PortfolioManagement => names::<portfolio::Step>(),
        }
    }

    pub fn info(&self) -> WorkflowInfo {
        WorkflowInfo {
            name: self.as_str(),
            description: self.description(),
            decision_field: self.decision_field(),
            workers: self.workers(),
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowKind {
    type Err = WorkflowError;

    /// Accepts `credit_underwriting` as well as `credit-underwriting`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(s.to_string()))
    }
}

/// Catalog entry as listed by the CLI and the HTTP API
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub decision_field: &'static str,
    pub workers: Vec<&'static str>,
}

/// A request to run one workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub workflow: WorkflowKind,
    /// Generated when absent
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Replaces the workflow's built-in route table
    #[serde(default)]
    pub routes: Option<RouteTableDef>,
    /// Overrides both the runtime and route table budgets
    #[serde(default)]
    pub max_steps: Option<usize>,
}

impl RunRequest {
    pub fn new(workflow: WorkflowKind, inputs: Map<String, Value>) -> Self {
        Self {
            workflow,
            run_id: None,
            inputs,
            routes: None,
            max_steps: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn with_routes(mut self, routes: RouteTableDef) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Result of a run that did not fault
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub workflow: WorkflowKind,
    pub status: RunStatus,
    /// Value of the workflow's decision field, if the run got that far
    pub decision: Option<Value>,
    pub state: WorkflowState,
}

impl RunReport {
    fn new(kind: WorkflowKind, outcome: RunOutcome) -> Self {
        Self {
            run_id: outcome.state.run_id().to_string(),
            workflow: kind,
            status: outcome.status,
            decision: outcome.state.get(kind.decision_field()).cloned(),
            state: outcome.state,
        }
    }
}

/// Owns the collaborators every workflow is assembled from
pub struct Runtime {
    config: RuntimeConfig,
    sources: Sources,
    model: Arc<dyn Model>,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
}

impl Runtime {
    pub fn new(config: RuntimeConfig, sources: Sources, model: Arc<dyn Model>) -> Self {
        Self {
            config,
            sources,
            model,
            checkpoint: None,
        }
    }

    /// Assemble a runtime with mock sources and the configured model
    ///
    /// Without an API key the offline model drafts reports.
    pub fn from_config(config: RuntimeConfig) -> Result<Self, RelayError> {
        let model: Arc<dyn Model> = match &config.api_key {
            Some(key) => Arc::new(OpenAIModel::with_settings(
                config.model_name.clone(),
                key.clone(),
                config.base_url.clone(),
                config.model_timeout,
            )?),
            None => {
                log::warn!("OPENAI_API_KEY not set; reports will be drafted by the offline model");
                Arc::new(OfflineModel::new())
            }
        };

        let checkpoint = config.checkpoint_dir.clone().map(|dir| {
            log::info!("Checkpointing runs to {}", dir.display());
            Arc::new(FileCheckpointStore::new(dir)) as Arc<dyn CheckpointStore>
        });

        let mut runtime = Self::new(config, Sources::mock(), model);
        runtime.checkpoint = checkpoint;
        Ok(runtime)
    }

    pub fn with_checkpoint(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint = Some(store);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn invoke(
        &self,
        request: RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RelayError> {
        self.invoke_with_events(request, cancel, None).await
    }

    /// Run a workflow, publishing progress on `events`
    pub async fn invoke_with_events(
        &self,
        request: RunRequest,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunReport, RelayError> {
        match request.workflow {
            WorkflowKind::FinancialAnalysis => {
                let builder = financial::builder(&self.sources, self.model.clone());
                self.start(builder, request, cancel, events).await
            }
            WorkflowKind::CreditUnderwriting => {
                self.start(credit::builder(), request, cancel, events).await
            }
            WorkflowKind::FraudDetection => {
                self.start(fraud::builder(&self.sources), request, cancel, events)
                    .await
            }
            WorkflowKind::ComplianceMonitoring => {
                self.start(compliance::builder(&self.sources), request, cancel, events)
                    .await
            }
            WorkflowKind::PortfolioManagement => {
                self.start(portfolio::builder(&self.sources), request, cancel, events)
                    .await
            }
        }
    }

    /// Continue a checkpointed run with the routes it was started with
    ///
    /// `max_steps` replaces the run's step budget and is remembered for
    /// later resumes. The budget counts steps from the start of the run.
    pub async fn resume(
        &self,
        kind: WorkflowKind,
        run_id: &str,
        max_steps: Option<usize>,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunReport, RelayError> {
        match kind {
            WorkflowKind::FinancialAnalysis => {
                let builder = financial::builder(&self.sources, self.model.clone());
                self.continue_run(kind, builder, run_id, max_steps, cancel, events).await
            }
            WorkflowKind::CreditUnderwriting => {
                let builder = credit::builder();
                self.continue_run(kind, builder, run_id, max_steps, cancel, events)
                    .await
            }
            WorkflowKind::FraudDetection => {
                let builder = fraud::builder(&self.sources);
                self.continue_run(kind, builder, run_id, max_steps, cancel, events).await
            }
            WorkflowKind::ComplianceMonitoring => {
                let builder = compliance::builder(&self.sources);
                self.continue_run(kind, builder, run_id, max_steps, cancel, events).await
            }
            WorkflowKind::PortfolioManagement => {
                let builder = portfolio::builder(&self.sources);
                self.continue_run(kind, builder, run_id, max_steps, cancel, events).await
            }
        }
    }

    /// Run independent requests concurrently; results keep request order
    pub async fn invoke_all(
        &self,
        requests: Vec<RunRequest>,
        cancel: &CancellationToken,
    ) -> Vec<Result<RunReport, RelayError>> {
        join_all(requests.into_iter().map(|req| self.invoke(req, cancel))).await
    }

    /// Last committed state of a run
    pub async fn checkpoint(&self, run_id: &str) -> Result<Option<WorkflowState>, RelayError> {
        match &self.checkpoint {
            Some(store) => store.load(run_id).await,
            None => Err(RelayError::checkpoint("no checkpoint store configured")),
        }
    }

    async fn start<W: WorkerId>(
        &self,
        builder: GraphBuilder<W>,
        request: RunRequest,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunReport, RelayError> {
        let kind = request.workflow;
        let runner = self.prepare(builder, request.routes.as_ref(), request.max_steps)?;
        let run_id = request
            .run_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        log::info!("Starting {} run '{}'", kind, run_id);
        let initial = runner.initial_state(&run_id, request.inputs)?;
        if let Some(store) = &self.checkpoint {
            let settings = RunSettings {
                routes: request.routes,
                max_steps: request.max_steps,
            };
            store.save_settings(&run_id, &settings).await?;
        }
        let outcome = runner.run_with_events(initial, cancel, events).await?;
        Ok(RunReport::new(kind, outcome))
    }

    async fn continue_run<W: WorkerId>(
        &self,
        kind: WorkflowKind,
        builder: GraphBuilder<W>,
        run_id: &str,
        max_steps: Option<usize>,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunReport, RelayError> {
        let mut settings = match &self.checkpoint {
            Some(store) => store.load_settings(run_id).await?.unwrap_or_default(),
            None => RunSettings::default(),
        };
        if max_steps.is_some() {
            settings.max_steps = max_steps;
        }

        let runner = self.prepare(builder, settings.routes.as_ref(), settings.max_steps)?;
        if let (Some(store), Some(n)) = (&self.checkpoint, max_steps) {
            if store.load(run_id).await?.is_some() {
                log::info!("Run '{}' step budget set to {}", run_id, n);
                store.save_settings(run_id, &settings).await?;
            }
        }
        let outcome = runner.resume(run_id, cancel, events).await?;
        Ok(RunReport::new(kind, outcome))
    }

    /// Budget precedence: request, then route table, then runtime config
    fn prepare<W: WorkerId>(
        &self,
        builder: GraphBuilder<W>,
        routes: Option<&RouteTableDef>,
        max_steps: Option<usize>,
    ) -> Result<GraphRunner<W>, RelayError> {
        let mut builder = builder.max_steps(self.config.max_steps);
        if let Some(def) = routes {
            if def.max_steps == Some(0) {
                return Err(RelayError::config(format!(
                    "route table '{}' sets max_steps to 0",
                    def.name
                )));
            }
            builder = builder.routes_from_def(def)?;
        }
        if let Some(n) = max_steps {
            if n == 0 {
                return Err(RelayError::config("max_steps must be at least 1"));
            }
            builder = builder.max_steps(n);
        }
        if let Some(store) = &self.checkpoint {
            builder = builder.checkpoint(store.clone());
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::workflow::checkpoint::InMemoryCheckpointStore;
    use serde_json::json;

    fn runtime() -> Runtime {
        Runtime::new(
            RuntimeConfig::default(),
            Sources::mock(),
            Arc::new(OfflineModel::new()),
        )
    }

    fn inputs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            "credit-underwriting".parse::<WorkflowKind>().unwrap(),
            WorkflowKind::CreditUnderwriting
        );
        assert_eq!(
            "fraud_detection".parse::<WorkflowKind>().unwrap(),
            WorkflowKind::FraudDetection
        );
        assert_eq!(
            "mortgage".parse::<WorkflowKind>().unwrap_err(),
            WorkflowError::UnknownWorkflow("mortgage".to_string())
        );
        for kind in WorkflowKind::all() {
            assert_eq!(kind.as_str().parse::<WorkflowKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_request_accepts_kebab_names() {
        let request: RunRequest = serde_json::from_value(json!({
            "workflow": "credit-underwriting",
            "inputs": {"credit_score": 720, "income": 5000, "debt": 1500}
        }))
        .unwrap();
        assert_eq!(request.workflow, WorkflowKind::CreditUnderwriting);
        assert!(request.run_id.is_none());
    }

    #[test]
    fn test_workers_listed_in_routing_order() {
        assert_eq!(
            WorkflowKind::CreditUnderwriting.workers(),
            vec!["credit_score", "dti", "decision"]
        );
        assert_eq!(WorkflowKind::FraudDetection.workers().len(), 4);
    }

    #[tokio::test]
    async fn test_invoke_reports_decision() {
        let request = RunRequest::new(
            WorkflowKind::CreditUnderwriting,
            inputs(json!({"credit_score": 720, "income": 5000, "debt": 1500})),
        )
        .with_run_id("run-1");

        let report = runtime()
            .invoke(request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.run_id, "run-1");
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.decision, Some(json!("APPROVED")));
    }

    #[tokio::test]
    async fn test_zero_budget_rejected() {
        let request = RunRequest::new(
            WorkflowKind::CreditUnderwriting,
            inputs(json!({"credit_score": 720, "income": 5000, "debt": 1500})),
        )
        .with_max_steps(0);

        let err = runtime()
            .invoke(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[tokio::test]
    async fn test_checkpoint_lookup() {
        let err = runtime().checkpoint("nope").await.unwrap_err();
        assert!(matches!(err, RelayError::Checkpoint(_)));

        let store = Arc::new(InMemoryCheckpointStore::new());
        let runtime = runtime().with_checkpoint(store);
        let request = RunRequest::new(
            WorkflowKind::PortfolioManagement,
            inputs(json!({"portfolio_id": "P-1", "holdings": [{"symbol": "AAPL", "value": 100.0}]})),
        )
        .with_run_id("p-1");
        runtime
            .invoke(request, &CancellationToken::new())
            .await
            .unwrap();

        let state = runtime.checkpoint("p-1").await.unwrap().unwrap();
        assert_eq!(state.step_count(), 3);
        assert!(runtime.checkpoint("p-2").await.unwrap().is_none());
    }
}
