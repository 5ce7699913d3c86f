//! Driver-level input injection through a per-tab debugging transport.
//!
//! Some pages ignore script-synthesized events but honor input that arrives through
//! the debugging protocol, so clicks are replayed on both channels. Attaching leaves
//! the tab visibly instrumented, so every run detaches when it ends.

use crate::dom::Point;
use crate::error::DriverError;
use crate::flow::TabId;
use ahash::AHashSet;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The out-of-process debugging/automation transport, one session per tab.
#[async_trait]
pub trait DebuggerTransport: Send + Sync {
    async fn attach(&self, tab: TabId, protocol_version: &str) -> Result<(), DriverError>;

    async fn detach(&self, tab: TabId) -> Result<(), DriverError>;

    async fn send_command(
        &self,
        tab: TabId,
        method: &str,
        params: Value,
    ) -> Result<Value, DriverError>;
}

/// Tracks which tabs are instrumented and injects mouse input by coordinate.
///
/// Failures are logged and swallowed: a missing driver-level click is not worth
/// aborting a run over, since the script-level event has already been dispatched.
pub struct RemoteInputDriver {
    transport: Arc<dyn DebuggerTransport>,
    protocol_version: String,
    attached: Mutex<AHashSet<TabId>>,
}

impl RemoteInputDriver {
    pub fn new(transport: Arc<dyn DebuggerTransport>, protocol_version: &str) -> Self {
        Self {
            transport,
            protocol_version: protocol_version.to_string(),
            attached: Mutex::new(AHashSet::new()),
        }
    }

    /// Attaches to `tab` unless already attached. Returns whether the tab is attached afterwards.
    pub async fn attach(&self, tab: TabId) -> bool {
        let mut attached = self.attached.lock().await;
        if attached.contains(&tab) {
            return true;
        }
        match self.transport.attach(tab, &self.protocol_version).await {
            Ok(()) => {
                debug!(%tab, protocol = %self.protocol_version, "debugger attached");
                attached.insert(tab);
                true
            }
            Err(e) => {
                warn!(%tab, error = %e, "debugger attach failed");
                false
            }
        }
    }

    /// Releases `tab`. Detaching a tab that was never attached is a no-op.
    pub async fn detach(&self, tab: TabId) {
        let mut attached = self.attached.lock().await;
        if !attached.remove(&tab) {
            debug!(%tab, "detach skipped, tab not attached");
            return;
        }
        match self.transport.detach(tab).await {
            Ok(()) => debug!(%tab, "debugger detached"),
            Err(e) => warn!(%tab, error = %e, "debugger detach failed"),
        }
    }

    pub async fn is_attached(&self, tab: TabId) -> bool {
        self.attached.lock().await.contains(&tab)
    }

    /// Presses and releases the left mouse button at `point`, attaching first if needed.
    pub async fn press_release(&self, tab: TabId, point: Point) {
        if !self.attach(tab).await {
            return;
        }
        for event_type in ["mousePressed", "mouseReleased"] {
            let params = json!({
                "type": event_type,
                "x": point.x,
                "y": point.y,
                "button": "left",
                "clickCount": 1,
            });
            if let Err(e) = self
                .transport
                .send_command(tab, "Input.dispatchMouseEvent", params)
                .await
            {
                warn!(%tab, event_type, error = %e, "driver mouse event failed");
                return;
            }
        }
        debug!(%tab, x = point.x, y = point.y, "driver click dispatched");
    }
}
