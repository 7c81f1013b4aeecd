// SPDX-License-Identifier: MIT

//! Checkpoint stores for resumable runs
//!
//! The orchestrator saves the state after every merged step. A run can later
//! be resumed from the last saved state with its transcript intact. The
//! routing a run was started with is saved once next to its state, so a
//! resumed run keeps the same route table and budget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adk::error::RelayError;
use crate::relay::workflow::state::WorkflowState;
use crate::relay::workflow::types::RouteTableDef;

/// Routing overrides a run was started with
///
/// `None` fields fall back to the workflow's built-in table and the runtime
/// budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    #[serde(default)]
    pub routes: Option<RouteTableDef>,
    #[serde(default)]
    pub max_steps: Option<usize>,
}

/// Persistence contract for run state
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist the committed state of a run, replacing any earlier save
    async fn save(&self, run_id: &str, state: &WorkflowState) -> Result<(), RelayError>;

    /// Load the last committed state, `None` if the run was never saved
    async fn load(&self, run_id: &str) -> Result<Option<WorkflowState>, RelayError>;

    /// Persist the routing settings of a run
    async fn save_settings(&self, run_id: &str, settings: &RunSettings)
        -> Result<(), RelayError>;

    /// Load the routing settings of a run, `None` if none were saved
    async fn load_settings(&self, run_id: &str) -> Result<Option<RunSettings>, RelayError>;
}

/// Process-local store
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    states: Arc<RwLock<HashMap<String, WorkflowState>>>,
    settings: Arc<RwLock<HashMap<String, RunSettings>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, run_id: &str, state: &WorkflowState) -> Result<(), RelayError> {
        let mut states = self.states.write().await;
        states.insert(run_id.to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<WorkflowState>, RelayError> {
        let states = self.states.read().await;
        Ok(states.get(run_id).cloned())
    }

    async fn save_settings(
        &self,
        run_id: &str,
        settings: &RunSettings,
    ) -> Result<(), RelayError> {
        let mut all = self.settings.write().await;
        all.insert(run_id.to_string(), settings.clone());
        Ok(())
    }

    async fn load_settings(&self, run_id: &str) -> Result<Option<RunSettings>, RelayError> {
        let all = self.settings.read().await;
        Ok(all.get(run_id).cloned())
    }
}

/// One JSON file per run under a directory
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint file for a run
    ///
    /// Bytes outside `[A-Za-z0-9_-]` are percent-encoded so distinct run ids
    /// never share a file and no id escapes the directory.
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_run_id(run_id)))
    }

    /// Path of the settings file for a run
    ///
    /// The `.settings` suffix cannot clash with a state file because `.` is
    /// always encoded in run ids.
    pub fn settings_path_for(&self, run_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.settings.json", encode_run_id(run_id)))
    }

    async fn write_atomic(&self, path: &Path, body: Vec<u8>) -> Result<(), RelayError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        path: &Path,
    ) -> Result<Option<T>, RelayError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_run_id(run_id: &str) -> String {
    let mut name = String::with_capacity(run_id.len());
    for b in run_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            name.push(b as char);
        } else {
            name.push_str(&format!("%{:02X}", b));
        }
    }
    name
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, run_id: &str, state: &WorkflowState) -> Result<(), RelayError> {
        let path = self.path_for(run_id);
        self.write_atomic(&path, serde_json::to_vec_pretty(state)?)
            .await?;

        log::debug!(
            "Checkpointed run '{}' at step {} to {}",
            run_id,
            state.step_count(),
            path.display()
        );
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<WorkflowState>, RelayError> {
        Self::read_json(&self.path_for(run_id)).await
    }

    async fn save_settings(
        &self,
        run_id: &str,
        settings: &RunSettings,
    ) -> Result<(), RelayError> {
        let path = self.settings_path_for(run_id);
        self.write_atomic(&path, serde_json::to_vec_pretty(settings)?)
            .await
    }

    async fn load_settings(&self, run_id: &str) -> Result<Option<RunSettings>, RelayError> {
        Self::read_json(&self.settings_path_for(run_id)).await
    }
}
