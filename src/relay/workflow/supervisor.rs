// SPDX-License-Identifier: MIT

//! Supervisor - decides which worker runs next
//!
//! A [`RouteTable`] holds ordered `(predicate, worker)` pairs. The first
//! predicate that holds selects the worker; when none holds the run
//! terminates. Several predicates may hold at once: declared order is the
//! tie-break.

use std::fmt;

use super::condition::{self, Predicate};
use super::graph::WorkerId;
use super::state::WorkflowState;
use super::types::RouteTableDef;
use crate::adk::error::WorkflowError;

/// Outcome of a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision<W> {
    RunWorker(W),
    Terminate,
}

impl<W: WorkerId> fmt::Display for RoutingDecision<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingDecision::RunWorker(w) => write!(f, "run {}", w.as_str()),
            RoutingDecision::Terminate => write!(f, "terminate"),
        }
    }
}

/// Routing contract
///
/// `route` must be a pure function of the state it is given.
pub trait Supervisor<W: WorkerId>: Send + Sync {
    fn route(&self, state: &WorkflowState) -> RoutingDecision<W>;
}

/// One entry of a route table
#[derive(Debug, Clone, PartialEq)]
pub struct Route<W> {
    pub when: Predicate,
    pub worker: W,
}

/// Ordered precedence table of routes
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTable<W> {
    name: String,
    routes: Vec<Route<W>>,
}

impl<W: WorkerId> RouteTable<W> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    /// Append a route with lower precedence than all existing ones
    pub fn route(mut self, when: Predicate, worker: W) -> Self {
        self.routes.push(Route { when, worker });
        self
    }

    /// Append `<field> is unset → worker`
    pub fn when_unset(self, field: &str, worker: W) -> Self {
        self.route(Predicate::unset(field), worker)
    }

    /// Append `transcript < n → worker`
    pub fn when_transcript_below(self, n: usize, worker: W) -> Self {
        self.route(Predicate::transcript_below(n), worker)
    }

    /// Build a table from its YAML definition
    ///
    /// Worker names resolve against `W`; an unknown name fails here rather
    /// than at routing time.
    pub fn from_def(def: &RouteTableDef) -> Result<Self, WorkflowError> {
        if def.routes.is_empty() {
            return Err(WorkflowError::EmptyRouteTable(def.name.clone()));
        }

        let mut table = Self::new(def.name.clone());
        for route in &def.routes {
            let worker = W::parse(&route.worker).ok_or_else(|| WorkflowError::UnknownWorker {
                workflow: def.name.clone(),
                worker: route.worker.clone(),
            })?;
            table = table.route(condition::parse(&route.when)?, worker);
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routes(&self) -> &[Route<W>] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Workers whose predicates currently hold, in precedence order
    pub fn matching(&self, state: &WorkflowState) -> Vec<W> {
        self.routes
            .iter()
            .filter(|r| condition::evaluate(&r.when, state))
            .map(|r| r.worker)
            .collect()
    }
}

impl<W: WorkerId> Supervisor<W> for RouteTable<W> {
    fn route(&self, state: &WorkflowState) -> RoutingDecision<W> {
        let decision = self
            .routes
            .iter()
            .find(|r| condition::evaluate(&r.when, state))
            .map_or(RoutingDecision::Terminate, |r| {
                RoutingDecision::RunWorker(r.worker)
            });

        log::debug!(
            "[{}] {} after {} steps",
            self.name,
            decision,
            state.step_count()
        );
        decision
    }
}
