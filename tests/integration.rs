//! End-to-end tests of runs crossing the background/content boundary.
mod common;
use bugflow::data::{DriverCall, ElementFixture};
use bugflow::flow::{FlowData, START_NODE_ID, now_millis};
use bugflow::registry::{RunState, RunStatus};
use bugflow::error::RelayError;
use bugflow::relay::{BackgroundRequest, BackgroundResponse, RunActionsPayload, TabLoadState};
use bugflow::prelude::*;
use common::*;
use serde_json::json;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

const APP_URL: &str = "https://app.example/";
const TRACKER_URL: &str = "https://tracker.example/new";

fn tracker_fixture() -> BrowserFixture {
    BrowserFixture::new(APP_URL).with_page(
        TRACKER_URL,
        PageFixture::default()
            .with_element(ElementFixture::new("//div[@id='attach']").at(0.0, 100.0, 200.0, 50.0))
            .with_clipboard(png_clipboard()),
    )
}

fn handoff_graph() -> FlowGraph {
    compile(chain(
        new_tab_start(TRACKER_URL),
        vec![click("A", "//div[@id='attach']")],
    ))
}

#[tokio::test(start_paused = true)]
async fn test_new_tab_flow_runs_after_load_complete() {
    let sim = Simulation::new(tracker_fixture(), EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;

    let first = assert_ok!(sim.start_flow(origin, &handoff_graph()).await);
    let RunOutcome::Handoff { tab_id } = first.outcome else {
        panic!("expected a handoff, got {:?}", first.outcome);
    };
    assert_ne!(tab_id, origin);
    assert_eq!(sim.browser().url_of(tab_id).await.as_deref(), Some(TRACKER_URL));

    // Parked in the registry, bound to the new tab, nothing executed yet.
    let parked = sim.background().registry().get(&first.task_id).await.unwrap();
    assert_eq!(parked.tab_id, Some(tab_id));
    assert_eq!(parked.next_id, START_NODE_ID);
    assert_eq!(parked.status, RunStatus::Running);
    assert!(sim.page(tab_id).await.is_none());

    let loading = sim
        .background()
        .on_tab_updated(tab_id, TabLoadState::Loading)
        .await
        .unwrap();
    assert_eq!(loading, None);
    assert_eq!(sim.background().registry().len().await, 1);

    let resumed = assert_ok!(sim.pump().await);
    assert_eq!(resumed.len(), 1);
    let report = &resumed[0];
    assert_eq!(report.task_id, first.task_id);
    assert_eq!(report.visited(), vec!["A", "end"]);
    assert_eq!(report.status_code(), Some(1));
    assert!(report.pasted());
    assert!(sim.background().registry().is_empty().await);

    let page = sim.page(tab_id).await.unwrap();
    assert_eq!(page.url(), TRACKER_URL);
    assert_eq!(page.pasted_files().await.len(), 3);
    let origin_page = sim.page(origin).await.unwrap();
    assert!(origin_page.events().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_load_signal_resumes_nothing() {
    let sim = Simulation::new(tracker_fixture(), EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;
    let reports = assert_ok!(sim.run_flow(origin, &handoff_graph()).await);
    assert_eq!(reports.len(), 2);
    let RunOutcome::Handoff { tab_id } = reports[0].outcome else {
        panic!("expected a handoff");
    };

    let again = sim
        .background()
        .on_tab_updated(tab_id, TabLoadState::Complete)
        .await
        .unwrap();
    assert_eq!(again, None);
    assert!(assert_ok!(sim.pump().await).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_same_tab_flow_leaves_registry_untouched() {
    let fixture = BrowserFixture::new(APP_URL).with_page(
        APP_URL,
        PageFixture::default().with_element(ElementFixture::new("//button")),
    );
    let sim = Simulation::new(fixture, EngineConfig::default());
    let tab = sim.open_tab(APP_URL).await;
    let graph = compile(chain(start_node(), vec![click("A", "//button")]));

    let reports = assert_ok!(sim.run_flow(tab, &graph).await);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status_code(), Some(1));
    assert!(sim.background().registry().is_empty().await);
    assert_eq!(sim.browser().tab_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_clicks_and_detaches() {
    let sim = Simulation::new(tracker_fixture(), EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;
    let reports = assert_ok!(sim.run_flow(origin, &handoff_graph()).await);
    let RunOutcome::Handoff { tab_id } = reports[0].outcome else {
        panic!("expected a handoff");
    };

    let calls = sim.browser().driver_calls().await;
    assert_eq!(
        calls,
        vec![
            DriverCall::Attach {
                tab: tab_id,
                protocol_version: "1.3".to_string()
            },
            DriverCall::Command {
                tab: tab_id,
                method: "Input.dispatchMouseEvent".to_string(),
                params: json!({
                    "type": "mousePressed",
                    "x": 100.0,
                    "y": 125.0,
                    "button": "left",
                    "clickCount": 1
                }),
            },
            DriverCall::Command {
                tab: tab_id,
                method: "Input.dispatchMouseEvent".to_string(),
                params: json!({
                    "type": "mouseReleased",
                    "x": 100.0,
                    "y": 125.0,
                    "button": "left",
                    "clickCount": 1
                }),
            },
            DriverCall::Detach { tab: tab_id },
        ]
    );
    assert!(!sim.background().driver().is_attached(tab_id).await);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_debugger_does_not_fail_run() {
    let mut fixture = tracker_fixture();
    fixture.debugger_unavailable = true;
    let sim = Simulation::new(fixture, EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;

    let reports = assert_ok!(sim.run_flow(origin, &handoff_graph()).await);

    assert_eq!(reports[1].status_code(), Some(1));
    assert!(sim.browser().driver_calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_missing_element_in_new_tab_aborts() {
    let fixture = BrowserFixture::new(APP_URL);
    let sim = Simulation::new(fixture, EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;

    let reports = assert_ok!(sim.run_flow(origin, &handoff_graph()).await);

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].status_code(), Some(-1));
    assert!(!reports[1].pasted());
    assert!(sim.background().registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_feishu_template_submission() {
    let url = "https://delonix.feishu.cn/issue/new";
    let fixture = BrowserFixture::new(APP_URL);
    let sim = Simulation::new(fixture, EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;
    let template = BugTemplate {
        id: "1".to_string(),
        name: "feishu".to_string(),
        kind: TemplateKind::Feishu,
        command: url.to_string(),
    };

    let reports = assert_ok!(sim.submit_bug(origin, &template).await);

    let RunOutcome::Handoff { tab_id } = reports[0].outcome else {
        panic!("expected a handoff");
    };
    assert_eq!(sim.browser().url_of(tab_id).await.as_deref(), Some(url));
    // The canned attachment area is not on the empty page.
    assert_eq!(reports[1].status_code(), Some(-1));
    assert_eq!(reports[1].task_id, reports[0].task_id);
}

#[tokio::test(start_paused = true)]
async fn test_run_actions_registers_and_cancels() {
    let sim = Simulation::new(BrowserFixture::new(APP_URL), EngineConfig::default());
    let tab = sim.open_tab(APP_URL).await;
    let background = sim.background();
    let task_id = TaskId::from("NAVIGATING");

    let registered = background
        .request(BackgroundRequest::RunActions(RunActionsPayload {
            task_id: task_id.clone(),
            next_id: "A".to_string(),
            status: RunStatus::Running,
            flow_data: FlowData::default(),
            time: now_millis(),
        }))
        .await
        .unwrap();
    assert_eq!(
        registered,
        BackgroundResponse::Registered {
            task_id: task_id.clone(),
            tab_id: tab
        }
    );
    assert_eq!(background.registry().len().await, 1);

    let cancelled = background
        .request(BackgroundRequest::RunActions(RunActionsPayload {
            task_id: task_id.clone(),
            next_id: "A".to_string(),
            status: RunStatus::Cancelled,
            flow_data: FlowData::default(),
            time: now_millis(),
        }))
        .await
        .unwrap();
    assert_eq!(
        cancelled,
        BackgroundResponse::Cancelled {
            task_id,
            removed: true
        }
    );
    let resumed = background
        .on_tab_updated(tab, TabLoadState::Complete)
        .await
        .unwrap();
    assert_eq!(resumed, None);
}

#[tokio::test(start_paused = true)]
async fn test_oldest_pending_run_resumes_first() {
    let sim = Simulation::new(BrowserFixture::new(APP_URL), EngineConfig::default());
    let tab = sim.open_tab(APP_URL).await;
    let registry = sim.background().registry();
    let data = compile(chain(start_node(), vec![])).into_data();

    for (task, time) in [("NEWER", 2_000), ("OLDER", 1_000)] {
        registry
            .upsert(RunState {
                task_id: TaskId::from(task),
                next_id: START_NODE_ID.to_string(),
                status: RunStatus::Running,
                flow_data: data.clone(),
                tab_id: Some(tab),
                time,
            })
            .await;
    }

    let first = sim
        .background()
        .on_tab_updated(tab, TabLoadState::Complete)
        .await
        .unwrap();
    assert_eq!(first, Some(TaskId::from("OLDER")));
    let second = sim
        .background()
        .on_tab_updated(tab, TabLoadState::Complete)
        .await
        .unwrap();
    assert_eq!(second, Some(TaskId::from("NEWER")));

    let reports = assert_ok!(sim.pump().await);
    let order: Vec<&str> = reports.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(order, vec!["OLDER", "NEWER"]);
}

#[tokio::test(start_paused = true)]
async fn test_registry_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.bin");
    let path = path.to_str().unwrap();

    let sim = Simulation::new(tracker_fixture(), EngineConfig::default());
    let origin = sim.open_tab(APP_URL).await;
    let first = assert_ok!(sim.start_flow(origin, &handoff_graph()).await);
    assert_ok!(sim.background().persist(path).await);

    let restarted = Simulation::new(tracker_fixture(), EngineConfig::default());
    let restored = assert_ok!(restarted.background().restore(path).await);
    assert_eq!(restored, 1);
    let run = restarted
        .background()
        .registry()
        .get(&first.task_id)
        .await
        .unwrap();
    assert_eq!(run.next_id, START_NODE_ID);
    assert!(!FlowGraph::new(run.flow_data).start_node().unwrap().requests_new_tab());
}

#[tokio::test(start_paused = true)]
async fn test_restore_from_missing_file() {
    let sim = Simulation::new(BrowserFixture::new(APP_URL), EngineConfig::default());
    assert_err!(sim.background().restore("/nonexistent/registry.bin").await);
}

#[tokio::test(start_paused = true)]
async fn test_undeliverable_resume_releases_driver() {
    let host = Arc::new(DeafHost::default());
    let background = BackgroundService::new(host.clone(), host.clone(), "1.3");
    let tab = TabId(5);
    background
        .registry()
        .upsert(RunState {
            task_id: TaskId::from("LOST"),
            next_id: START_NODE_ID.to_string(),
            status: RunStatus::Running,
            flow_data: compile(chain(start_node(), vec![])).into_data(),
            tab_id: Some(tab),
            time: 1_000,
        })
        .await;

    let result = background.on_tab_updated(tab, TabLoadState::Complete).await;

    assert_eq!(result, Err(RelayError::UnknownTab(5)));
    assert!(!background.driver().is_attached(tab).await);
    assert_eq!(host.detached(), vec![tab]);
    assert!(background.registry().is_empty().await);
}
