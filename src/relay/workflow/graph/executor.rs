// SPDX-License-Identifier: MIT

//! Graph runner - the supervisor-routed execution loop

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::{RunEvent, RunOutcome, RunStatus, WorkerId};
use crate::adk::error::{RelayError, RunError, RunFault, WorkflowError};
use crate::adk::worker::StateView;
use crate::relay::workflow::checkpoint::CheckpointStore;
use crate::relay::workflow::registry::WorkerRegistry;
use crate::relay::workflow::state::{StateSchema, WorkflowState};
use crate::relay::workflow::supervisor::{RoutingDecision, Supervisor};

/// Step budget used when neither the caller nor the route table sets one
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Executable workflow: schema, supervisor and registered workers
///
/// Built by [`GraphBuilder`](crate::relay::workflow::builder::GraphBuilder),
/// which validates the pieces against each other. A runner holds no per-run
/// state and can drive any number of independent runs concurrently.
pub struct GraphRunner<W: WorkerId> {
    name: String,
    schema: StateSchema,
    supervisor: Arc<dyn Supervisor<W>>,
    workers: WorkerRegistry<W>,
    max_steps: usize,
    checkpoint: Option<Arc<dyn CheckpointStore>>,
}

impl<W: WorkerId> GraphRunner<W> {
    pub(crate) fn from_parts(
        name: String,
        schema: StateSchema,
        supervisor: Arc<dyn Supervisor<W>>,
        workers: WorkerRegistry<W>,
        max_steps: usize,
        checkpoint: Option<Arc<dyn CheckpointStore>>,
    ) -> Self {
        Self {
            name,
            schema,
            supervisor,
            workers,
            max_steps,
            checkpoint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Create the initial state of a run from caller-supplied fields
    pub fn initial_state(
        &self,
        run_id: &str,
        inputs: Map<String, Value>,
    ) -> Result<WorkflowState, WorkflowError> {
        WorkflowState::new(run_id, self.name.as_str(), &self.schema, inputs)
    }

    /// Ask the supervisor for the next step without executing it
    pub fn route(&self, state: &WorkflowState) -> RoutingDecision<W> {
        self.supervisor.route(state)
    }

    /// Run to completion without cancellation or events
    pub async fn run(&self, initial: WorkflowState) -> Result<RunOutcome, RunFault> {
        self.run_with_events(initial, &CancellationToken::new(), None)
            .await
    }

    /// Run the supervisor loop
    ///
    /// Each iteration checks for cancellation, asks the supervisor for a
    /// decision, enforces the step budget, executes the chosen worker on a
    /// view of its declared reads, merges the result and saves a checkpoint.
    /// A fault carries the last fully merged state.
    pub async fn run_with_events(
        &self,
        initial: WorkflowState,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunOutcome, RunFault> {
        let mut state = initial;
        let run_id = state.run_id().to_string();

        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancelled(state, events).await);
            }

            let id = match self.supervisor.route(&state) {
                RoutingDecision::Terminate => {
                    log::info!(
                        "[{}] run '{}' completed after {} steps",
                        self.name,
                        run_id,
                        state.step_count()
                    );
                    emit(
                        events,
                        RunEvent::Finished {
                            run_id: run_id.clone(),
                            status: RunStatus::Completed,
                            steps: state.step_count(),
                        },
                    )
                    .await;
                    return Ok(RunOutcome {
                        status: RunStatus::Completed,
                        state,
                    });
                }
                RoutingDecision::RunWorker(id) => id,
            };

            if state.step_count() >= self.max_steps {
                let error = RunError::StepBudgetExceeded {
                    max_steps: self.max_steps,
                };
                return Err(self.fail(error, state, events).await);
            }

            let worker = match self.workers.get(id) {
                Some(worker) => worker,
                None => {
                    let error = RunError::UnknownWorker(id.as_str().to_string());
                    return Err(self.fail(error, state, events).await);
                }
            };

            let step = state.step_count() + 1;
            log::info!("[{}] run '{}' step {}: {}", self.name, run_id, step, id);
            emit(
                events,
                RunEvent::StepStarted {
                    run_id: run_id.clone(),
                    step,
                    worker: id.as_str().to_string(),
                },
            )
            .await;

            let view = StateView::new(&state, worker.reads());
            let executed = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = worker.execute(view) => Some(result),
            };

            let result = match executed {
                None => return Ok(self.cancelled(state, events).await),
                Some(Ok(result)) => result,
                Some(Err(failure)) => {
                    let error = RunError::WorkerFailure {
                        worker: id.as_str().to_string(),
                        reason: failure.reason,
                    };
                    return Err(self.fail(error, state, events).await);
                }
            };

            if let Some(key) = result
                .fields
                .keys()
                .find(|key| !worker.writes().contains(&key.as_str()))
            {
                let error = RunError::routing(format!(
                    "worker '{}' wrote undeclared field '{}'",
                    id, key
                ));
                return Err(self.fail(error, state, events).await);
            }

            let next = match state.apply(id.as_str(), &result, &self.schema) {
                Ok(next) => next,
                Err(error) => return Err(self.fail(error, state, events).await),
            };

            if let Some(store) = &self.checkpoint {
                if let Err(e) = store.save(&run_id, &next).await {
                    let error = RunError::Checkpoint(e.to_string());
                    return Err(self.fail(error, next, events).await);
                }
            }

            emit(
                events,
                RunEvent::StepCompleted {
                    run_id: run_id.clone(),
                    step,
                    worker: id.as_str().to_string(),
                    summary: result.summary,
                },
            )
            .await;

            state = next;
        }
    }

    /// Continue a checkpointed run from its last committed state
    pub async fn resume(
        &self,
        run_id: &str,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> Result<RunOutcome, RelayError> {
        let state = self.load_checkpoint(run_id).await?;
        log::info!(
            "[{}] resuming run '{}' at step {}",
            self.name,
            run_id,
            state.step_count()
        );
        Ok(self.run_with_events(state, cancel, events).await?)
    }

    /// Load the last committed state of a run of this workflow
    pub async fn load_checkpoint(&self, run_id: &str) -> Result<WorkflowState, RelayError> {
        let store = self
            .checkpoint
            .as_ref()
            .ok_or_else(|| RelayError::checkpoint("no checkpoint store configured"))?;

        let state = store
            .load(run_id)
            .await?
            .ok_or_else(|| WorkflowError::CheckpointNotFound(run_id.to_string()))?;

        if state.workflow() != self.name {
            return Err(RelayError::checkpoint(format!(
                "run '{}' belongs to workflow '{}', not '{}'",
                run_id,
                state.workflow(),
                self.name
            )));
        }
        Ok(state)
    }

    async fn cancelled(
        &self,
        state: WorkflowState,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> RunOutcome {
        log::warn!(
            "[{}] run '{}' cancelled after {} steps",
            self.name,
            state.run_id(),
            state.step_count()
        );
        emit(
            events,
            RunEvent::Finished {
                run_id: state.run_id().to_string(),
                status: RunStatus::Cancelled,
                steps: state.step_count(),
            },
        )
        .await;
        RunOutcome {
            status: RunStatus::Cancelled,
            state,
        }
    }

    async fn fail(
        &self,
        error: RunError,
        state: WorkflowState,
        events: Option<&mpsc::Sender<RunEvent>>,
    ) -> RunFault {
        log::error!("[{}] run '{}' faulted: {}", self.name, state.run_id(), error);
        emit(events, RunEvent::faulted(state.run_id(), &error, &state)).await;
        RunFault { error, state }
    }
}

async fn emit(events: Option<&mpsc::Sender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening any more.
        let _ = tx.send(event).await;
    }
}
