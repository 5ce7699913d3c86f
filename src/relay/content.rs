use super::{
    BackgroundLink, BackgroundRequest, BackgroundResponse, ContentMessage, DetachDebuggerPayload,
    RunActionsPayload,
};
use crate::compiler::Compiler;
use crate::config::EngineConfig;
use crate::dom::Page;
use crate::error::{RelayError, RunError};
use crate::flow::{BugTemplate, FlowGraph, IntoFlow, START_NODE_ID, TabId, TaskId, now_millis};
use crate::interpreter::{Interpreter, RunOutcome, RunReport, RunRequest};
use crate::registry::RunStatus;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The per-tab page context. Holds nothing across navigations: a run that
/// continues here arrives as a `BG_RUN_ACTION` message.
pub struct ContentScript {
    tab_id: TabId,
    link: Arc<dyn BackgroundLink>,
    config: EngineConfig,
    interpreter: Interpreter,
}

impl ContentScript {
    pub fn new(
        tab_id: TabId,
        page: Arc<dyn Page>,
        link: Arc<dyn BackgroundLink>,
        config: EngineConfig,
    ) -> Self {
        let interpreter = Interpreter::new(page, link.clone(), &config);
        Self {
            tab_id,
            link,
            config,
            interpreter,
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Expands `template` into a flow and runs it fresh from this tab.
    pub async fn submit_bug(&self, template: &BugTemplate) -> Result<RunReport, RunError> {
        let definition = template.into_flow()?;
        let compiled = Compiler::builder(definition)
            .with_config(&self.config)
            .build()
            .compile()?;
        info!(template = %template.name, tab = %self.tab_id, "submitting bug report");
        self.start(&compiled.graph).await
    }

    /// Runs an already compiled flow from its start node.
    pub async fn start(&self, graph: &FlowGraph) -> Result<RunReport, RunError> {
        let report = self
            .interpreter
            .run(graph, RunRequest::fresh(Some(self.tab_id)))
            .await;
        if !matches!(report, Ok(RunReport { outcome: RunOutcome::Handoff { .. }, .. })) {
            self.detach().await;
        }
        report
    }

    /// Parks a run in the background, bound to the active tab, so it survives a
    /// navigation. `cursor` is the last node already handled.
    pub async fn park(
        &self,
        graph: &FlowGraph,
        task_id: TaskId,
        cursor: &str,
    ) -> Result<TabId, RunError> {
        let request = BackgroundRequest::RunActions(RunActionsPayload {
            task_id,
            next_id: cursor.to_string(),
            status: RunStatus::Running,
            flow_data: graph.data().clone(),
            time: now_millis(),
        });
        match self.link.request(request).await? {
            BackgroundResponse::Registered { tab_id, .. } => Ok(tab_id),
            _ => Err(RelayError::UnexpectedResponse("RUN_ACTIONS".to_string()).into()),
        }
    }

    /// Withdraws a parked run before it resumes. Returns whether one was pending.
    pub async fn cancel(&self, graph: &FlowGraph, task_id: TaskId) -> Result<bool, RunError> {
        let request = BackgroundRequest::RunActions(RunActionsPayload {
            task_id,
            next_id: START_NODE_ID.to_string(),
            status: RunStatus::Cancelled,
            flow_data: graph.data().clone(),
            time: now_millis(),
        });
        match self.link.request(request).await? {
            BackgroundResponse::Cancelled { removed, .. } => Ok(removed),
            _ => Err(RelayError::UnexpectedResponse("RUN_ACTIONS".to_string()).into()),
        }
    }

    /// Handles a message delivered by the background process.
    pub async fn handle_message(&self, message: ContentMessage) -> Result<RunReport, RunError> {
        match message {
            ContentMessage::BgRunAction(payload) => {
                let graph = FlowGraph::new(payload.action.flow_data);
                let report = match payload.next_id {
                    Some(next_id) => {
                        debug!(
                            task_id = %payload.task_id,
                            tab = %payload.tab_id,
                            next_id,
                            "resuming run"
                        );
                        let request = RunRequest::resume(payload.task_id, &next_id, payload.tab_id);
                        self.interpreter.run(&graph, request).await
                    }
                    None => self
                        .interpreter
                        .exhausted(payload.task_id, &payload.action.next_id),
                };
                self.detach().await;
                report
            }
        }
    }

    async fn detach(&self) {
        let request = BackgroundRequest::DetachDebugger(DetachDebuggerPayload {
            tab_id: self.tab_id,
        });
        match self.link.request(request).await {
            Ok(BackgroundResponse::Detached { .. }) => {}
            Ok(other) => warn!(tab = %self.tab_id, response = ?other, "unexpected detach response"),
            Err(e) => warn!(tab = %self.tab_id, error = %e, "debugger detach request failed"),
        }
    }
}
