//! The process-wide run registry.
//!
//! Content scripts lose their memory on navigation, so a run that crosses a tab
//! boundary is parked here, in the background process, until the tab it is bound to
//! finishes loading. Taking an entry removes it: whoever takes it owns the run.

use crate::flow::{FlowData, TabId, TaskId};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

mod snapshot;

pub use snapshot::RegistrySnapshot;

/// Lifecycle status of a registered run, with its wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum RunStatus {
    Running,
    Cancelled,
    Aborted,
}

impl RunStatus {
    pub fn is_running(self) -> bool {
        matches!(self, RunStatus::Running)
    }
}

impl From<RunStatus> for i8 {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Running => 1,
            RunStatus::Cancelled => 0,
            RunStatus::Aborted => -1,
        }
    }
}

impl TryFrom<i8> for RunStatus {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(RunStatus::Running),
            0 => Ok(RunStatus::Cancelled),
            -1 => Ok(RunStatus::Aborted),
            other => Err(format!("unknown run status code {}", other)),
        }
    }
}

/// Everything needed to continue a run in another context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub task_id: TaskId,
    /// Id of the last node already handled; the resume starts at the node after it.
    pub next_id: String,
    pub status: RunStatus,
    pub flow_data: FlowData,
    pub tab_id: Option<TabId>,
    /// Epoch milliseconds; older runs bound to the same tab resume first.
    pub time: i64,
}

#[derive(Debug, Default, Clone)]
pub struct RunRegistry {
    runs: Arc<Mutex<AHashMap<TaskId, RunState>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces the run under its task id. Returns the replaced entry.
    pub async fn upsert(&self, state: RunState) -> Option<RunState> {
        let mut runs = self.runs.lock().await;
        debug!(
            task_id = %state.task_id,
            tab_id = ?state.tab_id,
            next_id = %state.next_id,
            "registering run"
        );
        runs.insert(state.task_id.clone(), state)
    }

    /// Drops a run that has not resumed yet.
    pub async fn cancel(&self, task_id: &TaskId) -> Option<RunState> {
        let removed = self.runs.lock().await.remove(task_id);
        if removed.is_some() {
            info!(%task_id, "run cancelled before resuming");
        }
        removed
    }

    pub async fn get(&self, task_id: &TaskId) -> Option<RunState> {
        self.runs.lock().await.get(task_id).cloned()
    }

    /// Takes the oldest run bound to `tab`, removing it from the registry.
    pub async fn take_for_tab(&self, tab: TabId) -> Option<RunState> {
        let mut runs = self.runs.lock().await;
        let task_id = runs
            .values()
            .filter(|run| run.tab_id == Some(tab))
            .min_by(|a, b| a.time.cmp(&b.time).then_with(|| a.task_id.0.cmp(&b.task_id.0)))
            .map(|run| run.task_id.clone())?;
        runs.remove(&task_id)
    }

    pub async fn len(&self) -> usize {
        self.runs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.lock().await.is_empty()
    }

    /// Copies every pending run, oldest first.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let runs = self.runs.lock().await;
        let mut pending: Vec<RunState> = runs.values().cloned().collect();
        pending.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.task_id.0.cmp(&b.task_id.0)));
        RegistrySnapshot { runs: pending }
    }

    /// Re-registers every run in `snapshot`. Existing entries with the same task id are replaced.
    pub async fn restore(&self, snapshot: RegistrySnapshot) {
        let mut runs = self.runs.lock().await;
        let count = snapshot.runs.len();
        for run in snapshot.runs {
            runs.insert(run.task_id.clone(), run);
        }
        info!(count, "registry restored");
    }
}
