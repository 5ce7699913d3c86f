use crate::config::PacingConfig;
use crate::dom::{ElementHandle, EventTarget, Locator, Page, PastedFile, SyntheticEvent};
use crate::error::PageError;
use crate::flow::{Action, ActionOutcome, ENTER_KEY_CODE, TabId};
use crate::relay::{BackgroundLink, BackgroundRequest, DebuggerClickPayload};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PASTED_FILE_NAME: &str = "pasted-image.png";

/// Turns an [`Action`] into synthetic events on the page.
///
/// Element actions locate their target first; a target that never shows up is
/// `NotFound`, any page error after that is `Failed`.
pub struct EventSynthesizer {
    page: Arc<dyn Page>,
    link: Arc<dyn BackgroundLink>,
    locator: Locator,
    select_confirm: Duration,
}

impl EventSynthesizer {
    pub fn new(
        page: Arc<dyn Page>,
        link: Arc<dyn BackgroundLink>,
        locator: Locator,
        pacing: &PacingConfig,
    ) -> Self {
        Self {
            page,
            link,
            locator,
            select_confirm: pacing.select_confirm(),
        }
    }

    pub async fn perform(&self, action: &Action, tab: Option<TabId>) -> ActionOutcome {
        let xpath = match action {
            Action::Paste => return self.paste().await,
            Action::Click { xpath }
            | Action::Input { xpath, .. }
            | Action::KeyDown { xpath, .. }
            | Action::Select { xpath } => xpath.as_str(),
        };
        let Some(element) = self.locator.locate(self.page.as_ref(), xpath).await else {
            return ActionOutcome::NotFound;
        };

        let result = match action {
            Action::Click { .. } => self.click(&element, xpath, tab).await,
            Action::Input { value, .. } => self.input(&element, value).await,
            Action::KeyDown { key_code, .. } => self.key_down(&element, *key_code).await,
            Action::Select { .. } => self.select(&element).await,
            Action::Paste => self.try_paste().await,
        };
        match result {
            Ok(()) => ActionOutcome::Success,
            Err(e) => {
                warn!(kind = %action.kind(), xpath, error = %e, "event synthesis failed");
                ActionOutcome::Failed
            }
        }
    }

    async fn focus_and_wait_frame(&self, element: &ElementHandle) -> Result<(), PageError> {
        self.page.focus(element).await?;
        self.page.next_frame().await;
        Ok(())
    }

    /// Dispatches a script-level click, then asks the driver for the same gesture.
    async fn click(
        &self,
        element: &ElementHandle,
        xpath: &str,
        tab: Option<TabId>,
    ) -> Result<(), PageError> {
        self.focus_and_wait_frame(element).await?;
        self.page
            .dispatch(EventTarget::Element(element.clone()), SyntheticEvent::Click)
            .await?;
        let rect = self.page.bounding_rect(element).await?;

        let Some(tab_id) = tab else {
            debug!(xpath, "run is not bound to a tab, skipping driver click");
            return Ok(());
        };
        let request = BackgroundRequest::DebuggerClick(DebuggerClickPayload {
            selector: Some(xpath.to_string()),
            tab_id,
            rect,
        });
        if let Err(e) = self.link.request(request).await {
            warn!(%tab_id, xpath, error = %e, "driver click request failed");
        }
        Ok(())
    }

    async fn input(&self, element: &ElementHandle, value: &str) -> Result<(), PageError> {
        self.focus_and_wait_frame(element).await?;
        self.page.set_value(element, value).await?;
        self.page
            .dispatch(
                EventTarget::Element(element.clone()),
                SyntheticEvent::Input {
                    data: value.to_string(),
                },
            )
            .await
    }

    async fn key_down(&self, element: &ElementHandle, key_code: u32) -> Result<(), PageError> {
        self.focus_and_wait_frame(element).await?;
        self.page
            .dispatch(
                EventTarget::Element(element.clone()),
                SyntheticEvent::KeyDown { key_code },
            )
            .await
    }

    /// Custom dropdowns want one Enter to open and a second one to confirm.
    async fn select(&self, element: &ElementHandle) -> Result<(), PageError> {
        self.focus_and_wait_frame(element).await?;
        let enter = SyntheticEvent::KeyDown {
            key_code: ENTER_KEY_CODE,
        };
        self.page
            .dispatch(EventTarget::Element(element.clone()), enter.clone())
            .await?;
        tokio::time::sleep(self.select_confirm).await;
        self.page
            .dispatch(EventTarget::Element(element.clone()), enter)
            .await
    }

    /// Pastes the first clipboard image into the page.
    pub async fn paste(&self) -> ActionOutcome {
        match self.try_paste().await {
            Ok(()) => ActionOutcome::Success,
            Err(e) => {
                warn!(error = %e, "paste failed");
                ActionOutcome::Failed
            }
        }
    }

    async fn try_paste(&self) -> Result<(), PageError> {
        self.page.next_frame().await;
        let items = self.page.read_clipboard().await?;
        let Some(image) = items.iter().find_map(|item| item.image()) else {
            debug!(items = items.len(), "clipboard holds no image, nothing to paste");
            return Ok(());
        };
        let file = PastedFile {
            name: PASTED_FILE_NAME.to_string(),
            mime: image.mime.clone(),
            bytes: image.bytes.clone(),
        };
        // Listeners live in different places on different sites.
        for target in [
            EventTarget::Document,
            EventTarget::ActiveElement,
            EventTarget::Window,
        ] {
            self.page
                .dispatch(target, SyntheticEvent::Paste { file: file.clone() })
                .await?;
        }
        debug!(mime = %file.mime, bytes = file.bytes.len(), "paste dispatched");
        Ok(())
    }
}
