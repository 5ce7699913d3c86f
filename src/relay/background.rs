use super::{
    BackgroundLink, BackgroundRequest, BackgroundResponse, BrowserHost, ContentMessage,
    OpenNewTabPayload, ResumePayload, RunActionsPayload, TabLoadState,
};
use crate::driver::{DebuggerTransport, RemoteInputDriver};
use crate::error::{RegistryError, RelayError};
use crate::flow::{FlowGraph, TabId, TaskId};
use crate::registry::{RegistrySnapshot, RunRegistry, RunState};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The long-lived background process: owns the run registry and the driver.
pub struct BackgroundService {
    registry: RunRegistry,
    host: Arc<dyn BrowserHost>,
    driver: RemoteInputDriver,
}

impl BackgroundService {
    pub fn new(
        host: Arc<dyn BrowserHost>,
        transport: Arc<dyn DebuggerTransport>,
        protocol_version: &str,
    ) -> Self {
        Self {
            registry: RunRegistry::new(),
            host,
            driver: RemoteInputDriver::new(transport, protocol_version),
        }
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    pub fn driver(&self) -> &RemoteInputDriver {
        &self.driver
    }

    /// Reacts to a tab load event. Once `tab` has finished loading, the oldest run
    /// bound to it is taken from the registry and delivered to the tab.
    ///
    /// Returns the task id of the delivered run. Taking removes the entry, so a
    /// repeated `Complete` for the same load resumes nothing.
    pub async fn on_tab_updated(
        &self,
        tab: TabId,
        state: TabLoadState,
    ) -> Result<Option<TaskId>, RelayError> {
        if state != TabLoadState::Complete {
            return Ok(None);
        }
        let Some(run) = self.registry.take_for_tab(tab).await else {
            debug!(%tab, "tab loaded with no pending run");
            return Ok(None);
        };
        if !run.status.is_running() {
            debug!(task_id = %run.task_id, %tab, "dropping run that is no longer running");
            return Ok(None);
        }

        let graph = FlowGraph::new(run.flow_data.clone());
        let next_id = graph.next_id(&run.next_id).map(str::to_string);
        if next_id.is_none() {
            warn!(task_id = %run.task_id, cursor = %run.next_id, "parked cursor has no successor");
        }

        // Clicks in the resumed run go through the driver; attach while the page is fresh.
        self.driver.attach(tab).await;

        let task_id = run.task_id.clone();
        let message = ContentMessage::BgRunAction(ResumePayload {
            next_id,
            task_id: task_id.clone(),
            tab_id: tab,
            action: run,
        });
        if let Err(e) = self.host.send_to_tab(tab, message).await {
            warn!(%task_id, %tab, error = %e, "run could not be delivered, releasing driver");
            self.driver.detach(tab).await;
            return Err(e);
        }
        info!(%task_id, %tab, "run delivered to tab");
        Ok(Some(task_id))
    }

    pub async fn persist(&self, path: &str) -> Result<(), RegistryError> {
        self.registry.snapshot().await.save(path)
    }

    /// Reloads pending runs saved by [`persist`](Self::persist).
    pub async fn restore(&self, path: &str) -> Result<usize, RegistryError> {
        let snapshot = RegistrySnapshot::from_file(path)?;
        let count = snapshot.runs.len();
        self.registry.restore(snapshot).await;
        Ok(count)
    }

    async fn run_actions(
        &self,
        payload: RunActionsPayload,
    ) -> Result<BackgroundResponse, RelayError> {
        if !payload.status.is_running() {
            let removed = self.registry.cancel(&payload.task_id).await.is_some();
            return Ok(BackgroundResponse::Cancelled {
                task_id: payload.task_id,
                removed,
            });
        }
        let tab_id = self.host.active_tab().await.ok_or(RelayError::NoActiveTab)?;
        self.registry
            .upsert(RunState {
                task_id: payload.task_id.clone(),
                next_id: payload.next_id,
                status: payload.status,
                flow_data: payload.flow_data,
                tab_id: Some(tab_id),
                time: payload.time,
            })
            .await;
        Ok(BackgroundResponse::Registered {
            task_id: payload.task_id,
            tab_id,
        })
    }

    async fn open_new_tab(
        &self,
        payload: OpenNewTabPayload,
    ) -> Result<BackgroundResponse, RelayError> {
        let tab_id = self.host.create_tab(&payload.new_tab_url).await?;
        info!(
            task_id = %payload.task_id,
            %tab_id,
            url = %payload.new_tab_url,
            "opened tab for run"
        );
        self.registry
            .upsert(RunState {
                task_id: payload.task_id.clone(),
                next_id: payload.next_id,
                status: payload.status,
                flow_data: payload.flow_data,
                tab_id: Some(tab_id),
                time: payload.time,
            })
            .await;
        Ok(BackgroundResponse::TabOpened {
            task_id: payload.task_id,
            tab_id,
        })
    }
}

#[async_trait]
impl BackgroundLink for BackgroundService {
    async fn request(&self, request: BackgroundRequest) -> Result<BackgroundResponse, RelayError> {
        debug!(action = request.name(), "background request");
        match request {
            BackgroundRequest::RunActions(payload) => self.run_actions(payload).await,
            BackgroundRequest::OpenNewTab(payload) => self.open_new_tab(payload).await,
            BackgroundRequest::DetachDebugger(payload) => {
                self.driver.detach(payload.tab_id).await;
                Ok(BackgroundResponse::Detached {
                    tab_id: payload.tab_id,
                })
            }
            BackgroundRequest::DebuggerClick(payload) => {
                self.driver
                    .press_release(payload.tab_id, payload.rect.center())
                    .await;
                Ok(BackgroundResponse::Clicked {
                    tab_id: payload.tab_id,
                })
            }
        }
    }
}
