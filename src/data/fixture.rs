use crate::dom::{ClipboardItem, Rect};
use crate::error::FixtureError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;

/// An element a simulated page can resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementFixture {
    pub xpath: String,
    pub rect: Rect,
    /// Milliseconds after page load before the element is rendered.
    pub appears_after_ms: u64,
    /// A detached element resolves but rejects focus and events.
    pub detached: bool,
}

impl ElementFixture {
    pub fn new(xpath: &str) -> Self {
        Self {
            xpath: xpath.to_string(),
            rect: Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 20.0,
            },
            ..Default::default()
        }
    }

    pub fn at(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Rect {
            x,
            y,
            width,
            height,
        };
        self
    }

    pub fn appearing_after(mut self, ms: u64) -> Self {
        self.appears_after_ms = ms;
        self
    }

    pub fn detached(mut self) -> Self {
        self.detached = true;
        self
    }
}

/// The document served at one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageFixture {
    pub elements: Vec<ElementFixture>,
    pub clipboard: Vec<ClipboardItem>,
    /// Clipboard reads are refused, as without the permission.
    pub clipboard_denied: bool,
}

impl PageFixture {
    pub fn with_element(mut self, element: ElementFixture) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_clipboard(mut self, item: ClipboardItem) -> Self {
        self.clipboard.push(item);
        self
    }

    pub fn deny_clipboard(mut self) -> Self {
        self.clipboard_denied = true;
        self
    }
}

/// Everything the simulated browser serves, keyed by URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserFixture {
    /// URL of the tab the run is submitted from.
    pub start_url: String,
    pub pages: AHashMap<String, PageFixture>,
    /// Debugger attach requests are refused.
    pub debugger_unavailable: bool,
}

impl BrowserFixture {
    /// Load a fixture from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, FixtureError> {
        let content = fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        serde_json::from_str(json).map_err(|e| FixtureError::Parse(e.to_string()))
    }

    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_page(mut self, url: &str, page: PageFixture) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// The page served at `url`; unknown URLs serve an empty document.
    pub fn page(&self, url: &str) -> PageFixture {
        self.pages.get(url).cloned().unwrap_or_default()
    }
}
