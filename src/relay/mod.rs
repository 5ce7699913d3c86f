//! Cross-context relay between the background process and page contexts.
//!
//! The background process outlives navigations; content scripts do not. Runs that
//! must continue in another tab are parked in the [`crate::registry::RunRegistry`]
//! by [`BackgroundService`] and handed back to the tab's [`ContentScript`] once it
//! has loaded.

use crate::error::RelayError;
use crate::flow::TabId;
use async_trait::async_trait;

mod background;
mod content;
pub mod message;

pub use background::BackgroundService;
pub use content::ContentScript;
pub use message::*;

/// How a page context reaches the background process.
#[async_trait]
pub trait BackgroundLink: Send + Sync {
    async fn request(&self, request: BackgroundRequest) -> Result<BackgroundResponse, RelayError>;
}

/// Load state reported by the host for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabLoadState {
    Loading,
    Complete,
}

/// The extension runtime as seen from the background process.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    /// The active tab of the focused window.
    async fn active_tab(&self) -> Option<TabId>;

    /// Opens and activates a tab at `url`.
    async fn create_tab(&self, url: &str) -> Result<TabId, RelayError>;

    async fn send_to_tab(&self, tab: TabId, message: ContentMessage) -> Result<(), RelayError>;
}
