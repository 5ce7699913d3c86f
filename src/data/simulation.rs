use super::fixture::{BrowserFixture, ElementFixture, PageFixture};
use crate::config::EngineConfig;
use crate::dom::{
    ClipboardItem, ElementHandle, EventTarget, Page, PastedFile, Rect, SyntheticEvent,
};
use crate::driver::DebuggerTransport;
use crate::error::{DriverError, PageError, RelayError, RunError};
use crate::flow::{BugTemplate, FlowGraph, TabId};
use crate::interpreter::{RunOutcome, RunReport};
use crate::relay::{
    BackgroundLink, BackgroundService, BrowserHost, ContentMessage, ContentScript, TabLoadState,
};
use ahash::AHashMap;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const FRAME: Duration = Duration::from_millis(16);

/// An event a simulated page received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub target: EventTarget,
    pub event: SyntheticEvent,
}

#[derive(Debug, Default)]
struct PageState {
    events: Vec<RecordedEvent>,
    values: AHashMap<String, String>,
    focused: Option<ElementHandle>,
}

/// A document held in memory. Element handles are the element's path expression.
pub struct SimulatedPage {
    url: String,
    loaded_at: Instant,
    fixture: PageFixture,
    state: Mutex<PageState>,
}

impl SimulatedPage {
    pub fn new(url: &str, fixture: PageFixture) -> Self {
        Self {
            url: url.to_string(),
            loaded_at: Instant::now(),
            fixture,
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn events(&self) -> Vec<RecordedEvent> {
        self.state.lock().await.events.clone()
    }

    /// Events dispatched at the element resolved from `xpath`.
    pub async fn events_on(&self, xpath: &str) -> Vec<SyntheticEvent> {
        self.state
            .lock()
            .await
            .events
            .iter()
            .filter(|e| matches!(&e.target, EventTarget::Element(h) if h.0 == xpath))
            .map(|e| e.event.clone())
            .collect()
    }

    pub async fn value_of(&self, xpath: &str) -> Option<String> {
        self.state.lock().await.values.get(xpath).cloned()
    }

    pub async fn focused(&self) -> Option<ElementHandle> {
        self.state.lock().await.focused.clone()
    }

    /// Files delivered by paste events, one per dispatch target.
    pub async fn pasted_files(&self) -> Vec<PastedFile> {
        self.state
            .lock()
            .await
            .events
            .iter()
            .filter_map(|e| match &e.event {
                SyntheticEvent::Paste { file } => Some(file.clone()),
                _ => None,
            })
            .collect()
    }

    fn element(&self, handle: &ElementHandle) -> Result<&ElementFixture, PageError> {
        self.fixture
            .elements
            .iter()
            .find(|e| e.xpath == handle.0 && !e.detached)
            .ok_or_else(|| PageError::Detached(handle.0.clone()))
    }

    fn is_rendered(&self, element: &ElementFixture) -> bool {
        self.loaded_at.elapsed() >= Duration::from_millis(element.appears_after_ms)
    }
}

#[async_trait]
impl Page for SimulatedPage {
    async fn evaluate_xpath(&self, xpath: &str) -> Result<Option<ElementHandle>, PageError> {
        if !(xpath.starts_with('/') || xpath.starts_with('(')) {
            return Err(PageError::InvalidExpression(xpath.to_string()));
        }
        Ok(self
            .fixture
            .elements
            .iter()
            .find(|e| e.xpath == xpath && self.is_rendered(e))
            .map(|e| ElementHandle(e.xpath.clone())))
    }

    async fn focus(&self, element: &ElementHandle) -> Result<(), PageError> {
        self.element(element)?;
        self.state.lock().await.focused = Some(element.clone());
        Ok(())
    }

    async fn next_frame(&self) {
        tokio::time::sleep(FRAME).await;
    }

    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Rect, PageError> {
        Ok(self.element(element)?.rect)
    }

    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), PageError> {
        self.element(element)?;
        self.state
            .lock()
            .await
            .values
            .insert(element.0.clone(), value.to_string());
        Ok(())
    }

    async fn dispatch(&self, target: EventTarget, event: SyntheticEvent) -> Result<(), PageError> {
        if let EventTarget::Element(handle) = &target {
            self.element(handle)?;
        }
        self.state
            .lock()
            .await
            .events
            .push(RecordedEvent { target, event });
        Ok(())
    }

    async fn read_clipboard(&self) -> Result<Vec<ClipboardItem>, PageError> {
        if self.fixture.clipboard_denied {
            return Err(PageError::Clipboard("permission denied".to_string()));
        }
        Ok(self.fixture.clipboard.clone())
    }
}

/// A call the driver made on the debugging transport.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Attach { tab: TabId, protocol_version: String },
    Detach { tab: TabId },
    Command { tab: TabId, method: String, params: Value },
}

#[derive(Debug, Default)]
struct BrowserState {
    tabs: AHashMap<TabId, String>,
    active: Option<TabId>,
    next_tab: i64,
    pending_loads: VecDeque<TabId>,
    outbox: VecDeque<(TabId, ContentMessage)>,
    driver_calls: Vec<DriverCall>,
}

/// The extension host and debugging transport, in memory. Created tabs queue a
/// load; messages to tabs queue until [`Simulation::pump`] delivers them.
pub struct SimulatedBrowser {
    fixture: BrowserFixture,
    state: Mutex<BrowserState>,
}

impl SimulatedBrowser {
    pub fn new(fixture: BrowserFixture) -> Self {
        Self {
            fixture,
            state: Mutex::new(BrowserState {
                next_tab: 1,
                ..Default::default()
            }),
        }
    }

    /// Opens an already loaded, active tab at `url`.
    pub async fn open_tab(&self, url: &str) -> TabId {
        let mut state = self.state.lock().await;
        let tab = TabId(state.next_tab);
        state.next_tab += 1;
        state.tabs.insert(tab, url.to_string());
        state.active = Some(tab);
        tab
    }

    pub async fn url_of(&self, tab: TabId) -> Option<String> {
        self.state.lock().await.tabs.get(&tab).cloned()
    }

    pub async fn tab_count(&self) -> usize {
        self.state.lock().await.tabs.len()
    }

    pub async fn driver_calls(&self) -> Vec<DriverCall> {
        self.state.lock().await.driver_calls.clone()
    }

    pub fn page_fixture(&self, url: &str) -> PageFixture {
        self.fixture.page(url)
    }

    async fn next_load(&self) -> Option<TabId> {
        self.state.lock().await.pending_loads.pop_front()
    }

    async fn next_message(&self) -> Option<(TabId, ContentMessage)> {
        self.state.lock().await.outbox.pop_front()
    }
}

#[async_trait]
impl BrowserHost for SimulatedBrowser {
    async fn active_tab(&self) -> Option<TabId> {
        self.state.lock().await.active
    }

    async fn create_tab(&self, url: &str) -> Result<TabId, RelayError> {
        if url.trim().is_empty() {
            return Err(RelayError::TabCreation {
                url: url.to_string(),
                message: "empty url".to_string(),
            });
        }
        let mut state = self.state.lock().await;
        let tab = TabId(state.next_tab);
        state.next_tab += 1;
        state.tabs.insert(tab, url.to_string());
        state.active = Some(tab);
        state.pending_loads.push_back(tab);
        debug!(%tab, url, "simulated tab created");
        Ok(tab)
    }

    async fn send_to_tab(&self, tab: TabId, message: ContentMessage) -> Result<(), RelayError> {
        let mut state = self.state.lock().await;
        if !state.tabs.contains_key(&tab) {
            return Err(RelayError::UnknownTab(tab.0));
        }
        state.outbox.push_back((tab, message));
        Ok(())
    }
}

#[async_trait]
impl DebuggerTransport for SimulatedBrowser {
    async fn attach(&self, tab: TabId, protocol_version: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        if self.fixture.debugger_unavailable || !state.tabs.contains_key(&tab) {
            return Err(DriverError::Attach {
                tab: tab.0,
                message: "debugger unavailable".to_string(),
            });
        }
        state.driver_calls.push(DriverCall::Attach {
            tab,
            protocol_version: protocol_version.to_string(),
        });
        Ok(())
    }

    async fn detach(&self, tab: TabId) -> Result<(), DriverError> {
        self.state
            .lock()
            .await
            .driver_calls
            .push(DriverCall::Detach { tab });
        Ok(())
    }

    async fn send_command(
        &self,
        tab: TabId,
        method: &str,
        params: Value,
    ) -> Result<Value, DriverError> {
        self.state.lock().await.driver_calls.push(DriverCall::Command {
            tab,
            method: method.to_string(),
            params,
        });
        Ok(Value::Null)
    }
}

struct TabContext {
    page: Arc<SimulatedPage>,
    script: ContentScript,
}

/// A background process plus one content script per loaded tab.
pub struct Simulation {
    browser: Arc<SimulatedBrowser>,
    background: Arc<BackgroundService>,
    config: EngineConfig,
    contexts: Mutex<AHashMap<TabId, Arc<TabContext>>>,
}

impl Simulation {
    pub fn new(fixture: BrowserFixture, config: EngineConfig) -> Self {
        let browser = Arc::new(SimulatedBrowser::new(fixture));
        let background = Arc::new(BackgroundService::new(
            browser.clone(),
            browser.clone(),
            &config.debugger_protocol,
        ));
        Self {
            browser,
            background,
            config,
            contexts: Mutex::new(AHashMap::new()),
        }
    }

    pub fn browser(&self) -> &Arc<SimulatedBrowser> {
        &self.browser
    }

    pub fn background(&self) -> &Arc<BackgroundService> {
        &self.background
    }

    /// Opens the tab a user would submit from, with its content script loaded.
    pub async fn open_tab(&self, url: &str) -> TabId {
        let tab = self.browser.open_tab(url).await;
        self.load_context(tab, url).await;
        tab
    }

    pub async fn page(&self, tab: TabId) -> Option<Arc<SimulatedPage>> {
        self.contexts.lock().await.get(&tab).map(|c| c.page.clone())
    }

    /// Submits `template` from `tab` and follows the run across any tab it opens.
    /// Returns the report of every interpreter invocation, in order.
    pub async fn submit_bug(
        &self,
        tab: TabId,
        template: &BugTemplate,
    ) -> Result<Vec<RunReport>, RunError> {
        let context = self.context(tab).await?;
        let report = context.script.submit_bug(template).await?;
        self.follow(report).await
    }

    /// Runs an already compiled flow from `tab`, following any handoff.
    pub async fn run_flow(
        &self,
        tab: TabId,
        graph: &FlowGraph,
    ) -> Result<Vec<RunReport>, RunError> {
        let report = self.start_flow(tab, graph).await?;
        self.follow(report).await
    }

    /// Starts a flow from `tab` without delivering anything it leaves pending.
    pub async fn start_flow(&self, tab: TabId, graph: &FlowGraph) -> Result<RunReport, RunError> {
        let context = self.context(tab).await?;
        context.script.start(graph).await
    }

    async fn follow(&self, report: RunReport) -> Result<Vec<RunReport>, RunError> {
        let handed_off = matches!(report.outcome, RunOutcome::Handoff { .. });
        let mut reports = vec![report];
        if handed_off {
            reports.extend(self.pump().await?);
        }
        Ok(reports)
    }

    /// Delivers pending tab loads and relay messages until the browser is idle.
    /// A fresh document and content script are installed for every load.
    pub async fn pump(&self) -> Result<Vec<RunReport>, RunError> {
        let mut reports = Vec::new();
        loop {
            if let Some(tab) = self.browser.next_load().await {
                let url = self.browser.url_of(tab).await.unwrap_or_default();
                self.background
                    .on_tab_updated(tab, TabLoadState::Loading)
                    .await?;
                self.load_context(tab, &url).await;
                self.background
                    .on_tab_updated(tab, TabLoadState::Complete)
                    .await?;
                continue;
            }
            if let Some((tab, message)) = self.browser.next_message().await {
                let context = self.context(tab).await?;
                reports.push(context.script.handle_message(message).await?);
                continue;
            }
            return Ok(reports);
        }
    }

    async fn load_context(&self, tab: TabId, url: &str) {
        let page = Arc::new(SimulatedPage::new(url, self.browser.page_fixture(url)));
        let link: Arc<dyn BackgroundLink> = self.background.clone();
        let script = ContentScript::new(tab, page.clone(), link, self.config.clone());
        self.contexts
            .lock()
            .await
            .insert(tab, Arc::new(TabContext { page, script }));
    }

    async fn context(&self, tab: TabId) -> Result<Arc<TabContext>, RelayError> {
        self.contexts
            .lock()
            .await
            .get(&tab)
            .cloned()
            .ok_or(RelayError::UnknownTab(tab.0))
    }
}
