// SPDX-License-Identifier: MIT

use crate::adk::worker::Worker;
use crate::relay::workflow::graph::WorkerId;
use std::collections::HashMap;
use std::sync::Arc;

/// Workers of one workflow keyed by their typed id
#[derive(Clone)]
pub struct WorkerRegistry<W: WorkerId> {
    workers: HashMap<W, Arc<dyn Worker>>,
}

impl<W: WorkerId> WorkerRegistry<W> {
    pub fn new() -> Self {
        Self {
            workers: HashMap::new(),
        }
    }

    /// Register a worker, replacing any previous registration for `id`
    pub fn register(&mut self, id: W, worker: Arc<dyn Worker>) {
        if self.workers.insert(id, worker).is_some() {
            log::warn!("Worker '{}' registered twice; keeping the latest", id);
        }
    }

    pub fn get(&self, id: W) -> Option<Arc<dyn Worker>> {
        self.workers.get(&id).cloned()
    }

    pub fn contains(&self, id: W) -> bool {
        self.workers.contains_key(&id)
    }

    /// Registered ids in declaration order of `W`
    pub fn ids(&self) -> impl Iterator<Item = W> + '_ {
        W::all().iter().copied().filter(|id| self.contains(*id))
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl<W: WorkerId> Default for WorkerRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
