// SPDX-License-Identifier: MIT

//! Workflow builder - validates and assembles a runnable workflow
//!
//! Everything that can be checked without running is checked here: routed
//! workers are registered, predicates and worker I/O name schema fields, and
//! workers only write output fields.

use std::sync::Arc;

use crate::adk::error::WorkflowError;
use crate::adk::worker::Worker;
use crate::relay::workflow::checkpoint::CheckpointStore;
use crate::relay::workflow::condition::Predicate;
use crate::relay::workflow::graph::{GraphRunner, WorkerId, DEFAULT_MAX_STEPS};
use crate::relay::workflow::registry::WorkerRegistry;
use crate::relay::workflow::state::{FieldRole, StateSchema};
use crate::relay::workflow::supervisor::{RouteTable, Supervisor};
use crate::relay::workflow::types::RouteTableDef;

enum Routing<W: WorkerId> {
    Table(RouteTable<W>),
    Custom(Arc<dyn Supervisor<W>>),
}

/// Builder for [`GraphRunner`]
pub struct GraphBuilder<W: WorkerId> {
    name: String,
    schema: StateSchema,
    routing: Option<Routing<W>>,
    workers: WorkerRegistry<W>,
    max_steps: usize,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
}

impl<W: WorkerId> GraphBuilder<W> {
    pub fn new(name: impl Into<String>, schema: StateSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            routing: None,
            workers: WorkerRegistry::new(),
            max_steps: DEFAULT_MAX_STEPS,
            checkpoint: None,
        }
    }

    /// Route with a precedence table
    pub fn routes(mut self, table: RouteTable<W>) -> Self {
        self.routing = Some(Routing::Table(table));
        self
    }

    /// Route with a table loaded from YAML, honoring its step budget
    pub fn routes_from_def(mut self, def: &RouteTableDef) -> Result<Self, WorkflowError> {
        if let Some(max_steps) = def.max_steps {
            self.max_steps = max_steps;
        }
        Ok(self.routes(RouteTable::from_def(def)?))
    }

    /// Route with a custom supervisor; routes are then checked at run time only
    pub fn supervisor(mut self, supervisor: Arc<dyn Supervisor<W>>) -> Self {
        self.routing = Some(Routing::Custom(supervisor));
        self
    }

    pub fn worker(mut self, id: W, worker: Arc<dyn Worker>) -> Self {
        self.workers.register(id, worker);
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn checkpoint(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoint = Some(store);
        self
    }

    pub fn build(self) -> Result<GraphRunner<W>, WorkflowError> {
        for id in self.workers.ids() {
            if let Some(worker) = self.workers.get(id) {
                self.validate_worker(id, worker.as_ref())?;
            }
        }

        let supervisor: Arc<dyn Supervisor<W>> = match self.routing {
            None => return Err(WorkflowError::EmptyRouteTable(self.name)),
            Some(Routing::Custom(supervisor)) => supervisor,
            Some(Routing::Table(table)) => {
                if table.is_empty() {
                    return Err(WorkflowError::EmptyRouteTable(table.name().to_string()));
                }
                for route in table.routes() {
                    if !self.workers.contains(route.worker) {
                        return Err(WorkflowError::UnregisteredWorker(
                            route.worker.as_str().to_string(),
                        ));
                    }
                    check_predicate_fields(&route.when, &self.schema)?;
                }
                Arc::new(table)
            }
        };

        log::debug!(
            "Built workflow '{}' with {} workers, max {} steps",
            self.name,
            self.workers.len(),
            self.max_steps
        );

        Ok(GraphRunner::from_parts(
            self.name,
            self.schema,
            supervisor,
            self.workers,
            self.max_steps,
            self.checkpoint,
        ))
    }

    fn validate_worker(&self, id: W, worker: &dyn Worker) -> Result<(), WorkflowError> {
        if worker.name() != id.as_str() {
            return Err(WorkflowError::invalid_worker(
                id.as_str(),
                format!("registered worker reports name '{}'", worker.name()),
            ));
        }
        for field in worker.reads() {
            if !self.schema.contains(field) {
                return Err(WorkflowError::invalid_worker(
                    id.as_str(),
                    format!("reads '{}' which is not in the schema", field),
                ));
            }
        }
        for field in worker.writes() {
            match self.schema.get(field) {
                None => {
                    return Err(WorkflowError::invalid_worker(
                        id.as_str(),
                        format!("writes '{}' which is not in the schema", field),
                    ))
                }
                Some(def) if def.role != FieldRole::Output => {
                    return Err(WorkflowError::invalid_worker(
                        id.as_str(),
                        format!("writes input field '{}'", field),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Unset predicates must name a schema field (checked on the first path segment)
fn check_predicate_fields(predicate: &Predicate, schema: &StateSchema) -> Result<(), WorkflowError> {
    match predicate {
        Predicate::Unset(path) => {
            let root = path.split('.').next().unwrap_or(path);
            if schema.contains(root) {
                Ok(())
            } else {
                Err(WorkflowError::UnknownField(path.clone()))
            }
        }
        Predicate::And(a, b) | Predicate::Or(a, b) => {
            check_predicate_fields(a, schema)?;
            check_predicate_fields(b, schema)
        }
        Predicate::TranscriptBelow(_) | Predicate::Always => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::WorkerFailure;
    use crate::adk::worker::{StateView, WorkerResult};
    use crate::relay::workflow::loader::RouteTableLoader;
    use crate::relay::workflow::state::FieldType;
    use async_trait::async_trait;
    use std::fmt;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Step {
        Tier,
        Decide,
    }

    impl fmt::Display for Step {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    impl WorkerId for Step {
        fn all() -> &'static [Self] {
            &[Step::Tier, Step::Decide]
        }

        fn as_str(&self) -> &'static str {
            match self {
                Step::Tier => "tier",
                Step::Decide => "decide",
            }
        }
    }

    struct DeclaredWorker {
        name: &'static str,
        reads: &'static [&'static str],
        writes: &'static [&'static str],
    }

    #[async_trait]
    impl Worker for DeclaredWorker {
        fn name(&self) -> &str {
            self.name
        }

        fn reads(&self) -> &[&'static str] {
            self.reads
        }

        fn writes(&self) -> &[&'static str] {
            self.writes
        }

        async fn execute(&self, _state: StateView<'_>) -> Result<WorkerResult, WorkerFailure> {
            Ok(WorkerResult::new("noop"))
        }
    }

    fn worker(
        name: &'static str,
        reads: &'static [&'static str],
        writes: &'static [&'static str],
    ) -> Arc<dyn Worker> {
        Arc::new(DeclaredWorker {
            name,
            reads,
            writes,
        })
    }

    fn schema() -> StateSchema {
        StateSchema::new()
            .input("credit_score", FieldType::Integer)
            .output("credit_tier", FieldType::String)
            .output("decision", FieldType::String)
    }

    fn table() -> RouteTable<Step> {
        RouteTable::new("credit")
            .when_unset("credit_tier", Step::Tier)
            .when_unset("decision", Step::Decide)
    }

    #[test]
    fn test_build_valid_graph() {
        let runner = GraphBuilder::new("credit", schema())
            .routes(table())
            .worker(Step::Tier, worker("tier", &["credit_score"], &["credit_tier"]))
            .worker(Step::Decide, worker("decide", &["credit_tier"], &["decision"]))
            .max_steps(5)
            .build()
            .unwrap();
        assert_eq!(runner.name(), "credit");
        assert_eq!(runner.max_steps(), 5);
    }

    #[test]
    fn test_routed_worker_must_be_registered() {
        let err = GraphBuilder::new("credit", schema())
            .routes(table())
            .worker(Step::Tier, worker("tier", &["credit_score"], &["credit_tier"]))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, WorkflowError::UnregisteredWorker("decide".to_string()));
    }

    #[test]
    fn test_missing_routes() {
        let err = GraphBuilder::<Step>::new("credit", schema())
            .build()
            .err()
            .unwrap();
        assert_eq!(err, WorkflowError::EmptyRouteTable("credit".to_string()));
    }

    #[test]
    fn test_worker_io_must_fit_schema() {
        let err = GraphBuilder::new("credit", schema())
            .routes(table())
            .worker(Step::Tier, worker("tier", &["shoe_size"], &["credit_tier"]))
            .worker(Step::Decide, worker("decide", &[], &["decision"]))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, WorkflowError::InvalidWorker { .. }));

        let err = GraphBuilder::new("credit", schema())
            .routes(table())
            .worker(Step::Tier, worker("tier", &[], &["credit_score"]))
            .worker(Step::Decide, worker("decide", &[], &["decision"]))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            WorkflowError::invalid_worker("tier", "writes input field 'credit_score'")
        );
    }

    #[test]
    fn test_worker_name_must_match_id() {
        let err = GraphBuilder::new("credit", schema())
            .routes(table())
            .worker(Step::Tier, worker("tier", &["credit_score"], &["credit_tier"]))
            .worker(Step::Decide, worker("tier", &["credit_tier"], &["decision"]))
            .build()
            .err()
            .unwrap();
        assert_eq!(
            err,
            WorkflowError::invalid_worker("decide", "registered worker reports name 'tier'")
        );
    }

    #[test]
    fn test_predicate_must_name_schema_field() {
        let err = GraphBuilder::new("credit", schema())
            .routes(RouteTable::new("credit").when_unset("mood", Step::Tier))
            .worker(Step::Tier, worker("tier", &[], &["credit_tier"]))
            .build()
            .err()
            .unwrap();
        assert_eq!(err, WorkflowError::UnknownField("mood".to_string()));
    }

    #[test]
    fn test_routes_from_yaml_def_sets_budget() {
        let def = RouteTableLoader::parse_yaml(
            r#"
name: credit
max_steps: 3
routes:
  - when: "transcript < 1"
    worker: tier
  - when: "decision is unset"
    worker: decide
"#,
        )
        .unwrap();

        let runner = GraphBuilder::new("credit", schema())
            .routes_from_def(&def)
            .unwrap()
            .worker(Step::Tier, worker("tier", &[], &["credit_tier"]))
            .worker(Step::Decide, worker("decide", &[], &["decision"]))
            .build()
            .unwrap();
        assert_eq!(runner.max_steps(), 3);
    }
}
