// SPDX-License-Identifier: MIT

//! Route table definitions as written in YAML

use serde::{Deserialize, Serialize};

/// A supervisor route table definition
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct RouteTableDef {
    /// Name of the workflow the table routes
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Overrides the runtime step budget
    pub max_steps: Option<usize>,
    /// Routes in precedence order
    #[serde(default)]
    pub routes: Vec<RouteDef>,
}

/// One `(predicate, worker)` pair
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteDef {
    /// Predicate text, e.g. `decision is unset`
    pub when: String,
    /// Worker name
    pub worker: String,
}
