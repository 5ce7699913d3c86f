//! The action interpreter.
//!
//! A run walks the flow chain from `start` to `end`, one node at a time:
//!
//! ```text
//! AwaitingStart --(start requests new tab)--> Handoff
//!       |
//!       v
//!    Running --(action NotFound / Failed)--> Aborted
//!       |
//!       v
//!   Completed (end reached and pasted, or graph exhausted)
//! ```
//!
//! The interpreter itself only walks and waits; all page effects go through the
//! [`EventSynthesizer`], and the only cross-context effect is the `OPEN_NEW_TAB`
//! request of a handoff.

use crate::config::{EngineConfig, MalformedGraphPolicy};
use crate::dom::{Locator, Page};
use crate::error::{RelayError, RunError};
use crate::flow::{
    ActionKind, ActionOutcome, FlowGraph, FlowNode, NodeKind, START_NODE_ID, TabId, TaskId,
    now_millis,
};
use crate::registry::RunStatus;
use crate::relay::{BackgroundLink, BackgroundRequest, BackgroundResponse, OpenNewTabPayload};
use crate::synthesizer::EventSynthesizer;
use ahash::AHashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

mod report;

pub use report::{RunOutcome, RunReport, StepRecord};

/// Where a run picks up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// A fresh run: mint a task id and honor the start node's new-tab request.
    Start,
    /// Continue by executing this node first.
    At(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub cursor: Cursor,
    pub task_id: Option<TaskId>,
    /// Tab the run is bound to, used for driver-level input.
    pub tab_id: Option<TabId>,
}

impl RunRequest {
    pub fn fresh(tab_id: Option<TabId>) -> Self {
        Self {
            cursor: Cursor::Start,
            task_id: None,
            tab_id,
        }
    }

    pub fn resume(task_id: TaskId, next_id: &str, tab_id: TabId) -> Self {
        Self {
            cursor: Cursor::At(next_id.to_string()),
            task_id: Some(task_id),
            tab_id: Some(tab_id),
        }
    }
}

pub struct Interpreter {
    synthesizer: EventSynthesizer,
    link: Arc<dyn BackgroundLink>,
    settle: Duration,
    pre_paste: Duration,
    policy: MalformedGraphPolicy,
}

impl Interpreter {
    pub fn new(page: Arc<dyn Page>, link: Arc<dyn BackgroundLink>, config: &EngineConfig) -> Self {
        let synthesizer = EventSynthesizer::new(
            page,
            link.clone(),
            Locator::new(&config.locator),
            &config.pacing,
        );
        Self {
            synthesizer,
            link,
            settle: config.pacing.settle(),
            pre_paste: config.pacing.pre_paste(),
            policy: config.malformed_graph,
        }
    }

    /// Executes `graph` from the request's cursor until it completes, aborts or hands off.
    pub async fn run(&self, graph: &FlowGraph, request: RunRequest) -> Result<RunReport, RunError> {
        let mut visited: AHashSet<String> = AHashSet::new();
        let (task_id, mut pending, mut previous) = match request.cursor {
            Cursor::Start => {
                let task_id = TaskId::mint();
                let Some(start) = graph.start_node() else {
                    return self.malformed(
                        task_id,
                        Vec::new(),
                        START_NODE_ID,
                        "flow has no start node",
                    );
                };
                let Some(first) = graph.next_id(START_NODE_ID) else {
                    return self.malformed(task_id, Vec::new(), START_NODE_ID, "no outgoing edge");
                };
                // An empty chain never opens a tab.
                if start.requests_new_tab() {
                    return self.hand_off(graph, start, task_id).await;
                }
                info!(%task_id, flow = graph.name().unwrap_or("<unnamed>"), "run started");
                visited.insert(START_NODE_ID.to_string());
                (task_id, Some(first.to_string()), START_NODE_ID.to_string())
            }
            Cursor::At(node_id) => {
                if graph.node(&node_id).is_none() {
                    return Err(RunError::UnknownResumeNode(node_id));
                }
                let task_id = match request.task_id {
                    Some(task_id) => task_id,
                    None => {
                        warn!(node_id, "resuming without a task id, minting one");
                        TaskId::mint()
                    }
                };
                info!(%task_id, node_id, "run resumed");
                (task_id, Some(node_id), String::new())
            }
        };

        let mut steps = Vec::new();
        loop {
            let Some(node_id) = pending.take() else {
                return self.malformed(task_id, steps, &previous, "no outgoing edge");
            };
            let Some(node) = graph.node(&node_id) else {
                return self.malformed(task_id, steps, &previous, "edge points at a missing node");
            };
            if !visited.insert(node_id.clone()) {
                return self.malformed(task_id, steps, &node_id, "chain revisits this node");
            }

            // A cursor parked on start resumes at its successor without pacing.
            if node.kind == NodeKind::Start {
                pending = graph.next_id(&node_id).map(str::to_string);
                previous = node_id;
                continue;
            }

            if node.kind == NodeKind::End {
                tokio::time::sleep(self.pre_paste).await;
                let outcome = self.synthesizer.paste().await;
                steps.push(StepRecord {
                    node_id,
                    kind: ActionKind::Paste,
                    outcome,
                });
                info!(%task_id, paste = outcome.code(), "run completed");
                return Ok(RunReport {
                    task_id,
                    outcome: RunOutcome::Completed,
                    steps,
                    reached_end: true,
                });
            }

            match &node.action {
                Some(action) => {
                    debug!(%task_id, node_id, kind = %action.kind(), "performing action");
                    let outcome = self.synthesizer.perform(action, request.tab_id).await;
                    steps.push(StepRecord {
                        node_id: node_id.clone(),
                        kind: action.kind(),
                        outcome,
                    });
                    if !outcome.is_success() {
                        info!(%task_id, node_id, status = outcome.code(), "run aborted");
                        let outcome = match outcome {
                            ActionOutcome::NotFound => RunOutcome::ElementNotFound { node_id },
                            _ => RunOutcome::SynthesisFailed { node_id },
                        };
                        return Ok(RunReport {
                            task_id,
                            outcome,
                            steps,
                            reached_end: false,
                        });
                    }
                }
                None => debug!(%task_id, node_id, "node has no recognized action, skipping"),
            }

            tokio::time::sleep(self.settle).await;
            pending = graph.next_id(&node_id).map(str::to_string);
            previous = node_id;
        }
    }

    /// Parks the run in the background and asks for the start tab to be opened.
    async fn hand_off(
        &self,
        graph: &FlowGraph,
        start: &FlowNode,
        task_id: TaskId,
    ) -> Result<RunReport, RunError> {
        let Some(url) = start.start.as_ref().and_then(|s| s.url.clone()) else {
            return Err(RunError::GraphMalformed {
                node_id: start.id.clone(),
                reason: "new tab requested without a url".to_string(),
            });
        };
        let request = BackgroundRequest::OpenNewTab(OpenNewTabPayload {
            flow_data: graph.handoff_snapshot(),
            new_tab_url: url.clone(),
            next_id: START_NODE_ID.to_string(),
            status: RunStatus::Running,
            task_id: task_id.clone(),
            time: now_millis(),
        });
        match self.link.request(request).await? {
            BackgroundResponse::TabOpened { tab_id, .. } => {
                info!(%task_id, %tab_id, url, "run handed off to new tab");
                Ok(RunReport {
                    task_id,
                    outcome: RunOutcome::Handoff { tab_id },
                    steps: Vec::new(),
                    reached_end: false,
                })
            }
            _ => Err(RelayError::UnexpectedResponse("OPEN_NEW_TAB".to_string()).into()),
        }
    }

    /// Settles a resumed run whose parked cursor has nothing after it.
    pub fn exhausted(&self, task_id: TaskId, node_id: &str) -> Result<RunReport, RunError> {
        self.malformed(task_id, Vec::new(), node_id, "no outgoing edge")
    }

    /// The graph ended somewhere other than `end`.
    fn malformed(
        &self,
        task_id: TaskId,
        steps: Vec<StepRecord>,
        node_id: &str,
        reason: &str,
    ) -> Result<RunReport, RunError> {
        match self.policy {
            MalformedGraphPolicy::ImplicitEnd => {
                warn!(
                    %task_id,
                    node_id,
                    reason,
                    "flow ended without reaching end, treating as completed"
                );
                Ok(RunReport {
                    task_id,
                    outcome: RunOutcome::Completed,
                    steps,
                    reached_end: false,
                })
            }
            MalformedGraphPolicy::Reject => Err(RunError::GraphMalformed {
                node_id: node_id.to_string(),
                reason: reason.to_string(),
            }),
        }
    }
}
