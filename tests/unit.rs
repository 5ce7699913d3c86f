//! Unit tests for core bugflow functionality.
mod common;
use async_trait::async_trait;
use bugflow::config::LocatorConfig;
use bugflow::dom::{
    ClipboardItem, ElementHandle, EventTarget, Locator, Page, Rect, SyntheticEvent,
};
use bugflow::error::{PageError, TemplateError};
use bugflow::flow::FlowData;
use bugflow::registry::{RegistrySnapshot, RunState, RunStatus};
use bugflow::relay::{BackgroundRequest, OpenNewTabPayload};
use bugflow::prelude::{
    Action, ActionOutcome, EngineConfig, FlowConversionError, MalformedGraphPolicy, RunOutcome,
    RunReport, TabId, TaskId, TemplateKind, TemplateStore, TraceFormatter, parse_flow_document,
};
use common::*;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// A page whose path evaluation always misses or errors, counting attempts.
struct CountingPage {
    evaluations: AtomicU32,
    error: bool,
}

#[async_trait]
impl Page for CountingPage {
    async fn evaluate_xpath(&self, xpath: &str) -> Result<Option<ElementHandle>, PageError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if self.error {
            Err(PageError::InvalidExpression(xpath.to_string()))
        } else {
            Ok(None)
        }
    }
    async fn focus(&self, _: &ElementHandle) -> Result<(), PageError> {
        Ok(())
    }
    async fn next_frame(&self) {}
    async fn bounding_rect(&self, _: &ElementHandle) -> Result<Rect, PageError> {
        Ok(Rect::default())
    }
    async fn set_value(&self, _: &ElementHandle, _: &str) -> Result<(), PageError> {
        Ok(())
    }
    async fn dispatch(&self, _: EventTarget, _: SyntheticEvent) -> Result<(), PageError> {
        Ok(())
    }
    async fn read_clipboard(&self) -> Result<Vec<ClipboardItem>, PageError> {
        Ok(Vec::new())
    }
}

#[tokio::test(start_paused = true)]
async fn test_locator_gives_up_within_budget() {
    let page = CountingPage {
        evaluations: AtomicU32::new(0),
        error: false,
    };
    let started = Instant::now();

    let found = Locator::default().locate(&page, "//missing").await;

    assert_eq!(found, None);
    assert_eq!(page.evaluations.load(Ordering::SeqCst), 10);
    assert!(started.elapsed() <= Duration::from_millis(10 * 1000));
}

#[tokio::test(start_paused = true)]
async fn test_locator_counts_errors_as_misses() {
    let page = CountingPage {
        evaluations: AtomicU32::new(0),
        error: true,
    };
    let locator = Locator::new(&LocatorConfig {
        interval_ms: 50,
        max_attempts: 3,
    });

    assert_eq!(locator.locate(&page, "not a path").await, None);
    assert_eq!(page.evaluations.load(Ordering::SeqCst), 3);
}

#[test]
fn test_config_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.locator.interval(), Duration::from_millis(1000));
    assert_eq!(config.locator.max_attempts, 10);
    assert_eq!(config.pacing.settle(), Duration::from_millis(1000));
    assert_eq!(config.pacing.select_confirm(), Duration::from_millis(1000));
    assert_eq!(config.pacing.pre_paste(), Duration::from_millis(2000));
    assert_eq!(config.malformed_graph, MalformedGraphPolicy::ImplicitEnd);
    assert_eq!(config.debugger_protocol, "1.3");
    assert!(!config.reject_unknown_actions);
}

#[test]
fn test_config_partial_json() {
    let config = EngineConfig::from_json(
        r#"{"pacing": {"settle_ms": 250}, "malformed_graph": "reject"}"#,
    )
    .unwrap();
    assert_eq!(config.pacing.settle_ms, 250);
    assert_eq!(config.pacing.pre_paste_ms, 2000);
    assert_eq!(config.malformed_graph, MalformedGraphPolicy::Reject);
    assert_eq!(config.locator, LocatorConfig::default());

    assert!(EngineConfig::from_json("{\"locator\": 5}").is_err());
}

#[test]
fn test_template_store_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.json");

    let mut store = TemplateStore::open(&path).unwrap();
    assert!(store.list().is_empty());
    let added = store
        .add("Tracker", TemplateKind::Feishu, "https://tracker.example/new")
        .unwrap();

    let reopened = TemplateStore::open(&path).unwrap();
    assert_eq!(reopened.list(), &[added.clone()]);
    assert_eq!(reopened.get("Tracker").unwrap().id, added.id);
    assert_eq!(reopened.get(&added.id).unwrap().name, "Tracker");

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["bugConfigs"][0]["type"], "feishu");
    assert_eq!(raw["bugConfigs"][0]["command"], "https://tracker.example/new");

    assert!(store.remove(&added.id).unwrap());
    assert!(!store.remove(&added.id).unwrap());
    assert!(TemplateStore::open(&path).unwrap().list().is_empty());
}

#[test]
fn test_template_store_rejects_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TemplateStore::open(dir.path().join("t.json")).unwrap();

    assert!(matches!(
        store.add(" ", TemplateKind::Feishu, "https://x"),
        Err(TemplateError::Incomplete("name"))
    ));
    assert!(matches!(
        store.add("x", TemplateKind::Custom, ""),
        Err(TemplateError::Incomplete("command"))
    ));
    assert!(matches!(store.get("x"), Err(TemplateError::NotFound(_))));
}

#[test]
fn test_template_store_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(matches!(
        TemplateStore::open(&path),
        Err(TemplateError::Corrupt(_))
    ));
}

#[test]
fn test_parse_bare_recipe() {
    let json = r#"{
        "nodes": [
            {"id": "start", "data": {}},
            {"id": "A", "data": {"handleType": "click", "xPath": "//a"}},
            {"id": "end", "data": {}}
        ],
        "edges": [
            {"id": "1", "source": "start", "target": "A"},
            {"id": "2", "source": "A", "target": "end"}
        ]
    }"#;
    let flow = parse_flow_document(json).unwrap();
    assert_eq!(flow.nodes.len(), 3);
    assert_eq!(flow.name, None);

    let graph = compile(flow);
    assert_eq!(
        graph.node("A").unwrap().action,
        Some(Action::Click {
            xpath: "//a".to_string()
        })
    );
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(matches!(
        parse_flow_document("[]"),
        Err(FlowConversionError::JsonParseError(_))
    ));
    assert!(matches!(
        parse_flow_document(r#"{"nodes": [{"id": "", "data": {}}], "edges": []}"#),
        Err(FlowConversionError::ValidationError(_))
    ));
}

#[test]
fn test_run_status_wire_codes() {
    assert_eq!(serde_json::to_value(RunStatus::Running).unwrap(), json!(1));
    assert_eq!(serde_json::to_value(RunStatus::Cancelled).unwrap(), json!(0));
    assert_eq!(serde_json::to_value(RunStatus::Aborted).unwrap(), json!(-1));
    assert_eq!(
        serde_json::from_value::<RunStatus>(json!(-1)).unwrap(),
        RunStatus::Aborted
    );
    assert!(serde_json::from_value::<RunStatus>(json!(7)).is_err());
}

#[test]
fn test_action_outcome_codes() {
    assert_eq!(ActionOutcome::Success.code(), 1);
    assert_eq!(ActionOutcome::Failed.code(), 0);
    assert_eq!(ActionOutcome::NotFound.code(), -1);
    assert!(ActionOutcome::Success.is_success());
    assert!(!ActionOutcome::NotFound.is_success());
}

#[test]
fn test_background_request_wire_shape() {
    let request = BackgroundRequest::OpenNewTab(OpenNewTabPayload {
        flow_data: FlowData::default(),
        new_tab_url: "https://tracker.example/new".to_string(),
        next_id: "start".to_string(),
        status: RunStatus::Running,
        task_id: TaskId::from("ABC"),
        time: 42,
    });
    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["action"], "OPEN_NEW_TAB");
    assert_eq!(value["datas"]["newTabUrl"], "https://tracker.example/new");
    assert_eq!(value["datas"]["nextId"], "start");
    assert_eq!(value["datas"]["taskId"], "ABC");
    assert_eq!(value["datas"]["status"], 1);

    let back: BackgroundRequest = serde_json::from_value(value).unwrap();
    assert_eq!(back, request);
}

#[test]
fn test_registry_snapshot_bytes() {
    let snapshot = RegistrySnapshot {
        runs: vec![RunState {
            task_id: TaskId::from("T1"),
            next_id: "start".to_string(),
            status: RunStatus::Running,
            flow_data: compile(chain(start_node(), vec![click("A", "//a")])).into_data(),
            tab_id: Some(TabId(4)),
            time: 1_700_000_000_000,
        }],
    };
    let bytes = snapshot.to_bytes().unwrap();
    assert_eq!(RegistrySnapshot::from_bytes(&bytes).unwrap(), snapshot);
    assert!(RegistrySnapshot::from_bytes(&bytes[..bytes.len() / 2]).is_err());
}

#[test]
fn test_task_id_minting() {
    let a = TaskId::mint();
    let b = TaskId::mint();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 32);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
}

#[test]
fn test_trace_formatter_chain() {
    let graph = compile(chain(
        new_tab_start("https://tracker.example/new"),
        vec![
            click("A", "//a"),
            step("B", "input", "//input", Some("hi")),
            step("H", "hover", "//div", None),
        ],
    ));
    let text = TraceFormatter::format_chain(&graph);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines[0].ends_with("start (new tab: https://tracker.example/new)"));
    assert!(lines[1].ends_with("A click //a"));
    assert!(lines[2].ends_with("B input \"hi\" into //input"));
    assert!(lines[3].ends_with("H <skipped>"));
    assert!(lines[4].ends_with("end (paste)"));
}

#[test]
fn test_trace_formatter_report() {
    let report = RunReport {
        task_id: TaskId::from("T"),
        outcome: RunOutcome::ElementNotFound {
            node_id: "A".to_string(),
        },
        steps: vec![bugflow::interpreter::StepRecord {
            node_id: "A".to_string(),
            kind: bugflow::flow::ActionKind::Click,
            outcome: ActionOutcome::NotFound,
        }],
        reached_end: false,
    };
    let text = TraceFormatter::format_report(&report);
    assert!(text.starts_with("task T: aborted: element for 'A' not found (status -1)"));
    assert!(text.contains("not found"));
}
