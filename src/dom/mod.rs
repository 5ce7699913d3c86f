//! The page context a content script runs in.
//!
//! [`Page`] is the seam between the replay engine and a live document. A content
//! script binding implements it over the real DOM; [`crate::data::SimulatedPage`]
//! implements it in memory.

use crate::error::PageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod locator;

pub use locator::Locator;

/// Opaque reference to a live element, valid until the document changes under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

/// An element's bounding box in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Where a synthetic event is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    Element(ElementHandle),
    Document,
    ActiveElement,
    Window,
}

/// A file attached to a synthetic paste event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PastedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Script-level events the synthesizer produces. All bubble and are cancelable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    Click,
    Input { data: String },
    KeyDown { key_code: u32 },
    Paste { file: PastedFile },
}

/// One typed blob inside a clipboard item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// One item read from the system clipboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    pub entries: Vec<ClipboardEntry>,
}

impl ClipboardItem {
    /// The first entry whose type is an image.
    pub fn image(&self) -> Option<&ClipboardEntry> {
        self.entries.iter().find(|e| e.mime.starts_with("image/"))
    }
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Evaluates a structural path expression against the current document.
    async fn evaluate_xpath(&self, xpath: &str) -> Result<Option<ElementHandle>, PageError>;

    async fn focus(&self, element: &ElementHandle) -> Result<(), PageError>;

    /// Resolves on the next rendering frame.
    async fn next_frame(&self);

    async fn bounding_rect(&self, element: &ElementHandle) -> Result<Rect, PageError>;

    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), PageError>;

    async fn dispatch(&self, target: EventTarget, event: SyntheticEvent) -> Result<(), PageError>;

    async fn read_clipboard(&self) -> Result<Vec<ClipboardItem>, PageError>;
}
