use crate::dom::Rect;
use crate::flow::{FlowData, TabId, TaskId};
use crate::registry::{RunState, RunStatus};
use serde::{Deserialize, Serialize};

/// Requests page contexts send to the background process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "datas", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackgroundRequest {
    /// Register, update or (with a non-running status) cancel a pending run.
    RunActions(RunActionsPayload),
    /// Open a tab and register the run bound to it.
    OpenNewTab(OpenNewTabPayload),
    /// Release driver instrumentation on a tab.
    DetachDebugger(DetachDebuggerPayload),
    /// Driver-level press/release at the centre of `rect`.
    DebuggerClick(DebuggerClickPayload),
}

impl BackgroundRequest {
    pub fn name(&self) -> &'static str {
        match self {
            BackgroundRequest::RunActions(_) => "RUN_ACTIONS",
            BackgroundRequest::OpenNewTab(_) => "OPEN_NEW_TAB",
            BackgroundRequest::DetachDebugger(_) => "DETACH_DEBUGGER",
            BackgroundRequest::DebuggerClick(_) => "DEBUGGER_CLICK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunActionsPayload {
    pub task_id: TaskId,
    pub next_id: String,
    pub status: RunStatus,
    pub flow_data: FlowData,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenNewTabPayload {
    pub flow_data: FlowData,
    pub new_tab_url: String,
    pub next_id: String,
    pub status: RunStatus,
    pub task_id: TaskId,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachDebuggerPayload {
    pub tab_id: TabId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerClickPayload {
    pub selector: Option<String>,
    pub tab_id: TabId,
    pub rect: Rect,
}

/// Replies from the background process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundResponse {
    Registered { task_id: TaskId, tab_id: TabId },
    Cancelled { task_id: TaskId, removed: bool },
    TabOpened { task_id: TaskId, tab_id: TabId },
    Detached { tab_id: TabId },
    Clicked { tab_id: TabId },
}

/// Messages the background process delivers to a tab's content script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "datas", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentMessage {
    /// Continue a parked run in this tab.
    BgRunAction(ResumePayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePayload {
    /// The registry entry as it was parked.
    pub action: RunState,
    /// First node to execute; `None` when nothing follows the parked cursor.
    pub next_id: Option<String>,
    pub task_id: TaskId,
    pub tab_id: TabId,
}
