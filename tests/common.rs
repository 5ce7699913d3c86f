//! Common test utilities for building flows, pages and relay doubles.
use async_trait::async_trait;
use bugflow::compiler::Compiler;
use bugflow::dom::{ClipboardEntry, ClipboardItem};
use bugflow::driver::DebuggerTransport;
use bugflow::error::{DriverError, RelayError};
use bugflow::flow::{
    END_NODE_ID, FlowDefinition, FlowEdgeDefinition, FlowGraph, FlowNodeDefinition, START_NODE_ID,
    TabId,
};
use bugflow::relay::{
    BackgroundLink, BackgroundRequest, BackgroundResponse, BrowserHost, ContentMessage,
};
use serde_json::Value;
use std::sync::Mutex;

/// Tab id the recording link hands out for new tabs.
#[allow(dead_code)]
pub const OPENED_TAB: TabId = TabId(99);

#[allow(dead_code)]
pub fn click(id: &str, xpath: &str) -> FlowNodeDefinition {
    step(id, "click", xpath, None)
}

#[allow(dead_code)]
pub fn step(id: &str, handle_type: &str, xpath: &str, value: Option<&str>) -> FlowNodeDefinition {
    FlowNodeDefinition {
        id: id.to_string(),
        handle_type: Some(handle_type.to_string()),
        xpath: Some(xpath.to_string()),
        input_value: value.map(str::to_string),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn start_node() -> FlowNodeDefinition {
    FlowNodeDefinition {
        id: START_NODE_ID.to_string(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn new_tab_start(url: &str) -> FlowNodeDefinition {
    FlowNodeDefinition {
        id: START_NODE_ID.to_string(),
        new_tab: Some("1".to_string()),
        new_tab_url: Some(url.to_string()),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn end_node() -> FlowNodeDefinition {
    FlowNodeDefinition {
        id: END_NODE_ID.to_string(),
        ..Default::default()
    }
}

/// `start -> steps... -> end`, with edges declared in chain order.
#[allow(dead_code)]
pub fn chain(start: FlowNodeDefinition, steps: Vec<FlowNodeDefinition>) -> FlowDefinition {
    let mut ids: Vec<String> = vec![START_NODE_ID.to_string()];
    ids.extend(steps.iter().map(|s| s.id.clone()));
    ids.push(END_NODE_ID.to_string());

    let edges = ids
        .windows(2)
        .enumerate()
        .map(|(i, pair)| FlowEdgeDefinition::new(&format!("e{}", i), &pair[0], &pair[1]))
        .collect();

    let mut nodes = vec![start];
    nodes.extend(steps);
    nodes.push(end_node());
    FlowDefinition {
        name: Some("test-flow".to_string()),
        domain: Some("tracker.example".to_string()),
        nodes,
        edges,
    }
}

#[allow(dead_code)]
pub fn compile(flow: FlowDefinition) -> FlowGraph {
    Compiler::builder(flow)
        .build()
        .compile()
        .expect("flow should compile")
        .graph
}

#[allow(dead_code)]
pub fn png_clipboard() -> ClipboardItem {
    ClipboardItem {
        entries: vec![
            ClipboardEntry {
                mime: "text/plain".to_string(),
                bytes: b"caption".to_vec(),
            },
            ClipboardEntry {
                mime: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
        ],
    }
}

/// A background link that records every request and answers like a healthy background.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingLink {
    requests: Mutex<Vec<BackgroundRequest>>,
}

#[allow(dead_code)]
impl RecordingLink {
    pub fn requests(&self) -> Vec<BackgroundRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.requests().iter().map(BackgroundRequest::name).collect()
    }
}

#[async_trait]
impl BackgroundLink for RecordingLink {
    async fn request(&self, request: BackgroundRequest) -> Result<BackgroundResponse, RelayError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(match request {
            BackgroundRequest::RunActions(p) => BackgroundResponse::Registered {
                task_id: p.task_id,
                tab_id: TabId(1),
            },
            BackgroundRequest::OpenNewTab(p) => BackgroundResponse::TabOpened {
                task_id: p.task_id,
                tab_id: OPENED_TAB,
            },
            BackgroundRequest::DetachDebugger(p) => {
                BackgroundResponse::Detached { tab_id: p.tab_id }
            }
            BackgroundRequest::DebuggerClick(p) => BackgroundResponse::Clicked { tab_id: p.tab_id },
        })
    }
}

/// A host whose tabs never accept messages, with a debugger that always attaches.
#[derive(Default)]
#[allow(dead_code)]
pub struct DeafHost {
    detached: Mutex<Vec<TabId>>,
}

#[allow(dead_code)]
impl DeafHost {
    pub fn detached(&self) -> Vec<TabId> {
        self.detached.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserHost for DeafHost {
    async fn active_tab(&self) -> Option<TabId> {
        None
    }

    async fn create_tab(&self, _url: &str) -> Result<TabId, RelayError> {
        Err(RelayError::NoActiveTab)
    }

    async fn send_to_tab(&self, tab: TabId, _message: ContentMessage) -> Result<(), RelayError> {
        Err(RelayError::UnknownTab(tab.0))
    }
}

#[async_trait]
impl DebuggerTransport for DeafHost {
    async fn attach(&self, _tab: TabId, _protocol_version: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn detach(&self, tab: TabId) -> Result<(), DriverError> {
        self.detached.lock().unwrap().push(tab);
        Ok(())
    }

    async fn send_command(
        &self,
        _tab: TabId,
        _method: &str,
        _params: Value,
    ) -> Result<Value, DriverError> {
        Ok(Value::Null)
    }
}
