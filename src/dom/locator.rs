use super::{ElementHandle, Page};
use crate::config::LocatorConfig;
use std::time::Duration;
use tracing::debug;

/// Resolves path expressions to live elements, polling while the page renders.
#[derive(Debug, Clone)]
pub struct Locator {
    interval: Duration,
    max_attempts: u32,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(&LocatorConfig::default())
    }
}

impl Locator {
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Re-evaluates `xpath` up to `max_attempts` times, sleeping `interval` between
    /// attempts. Evaluation errors count as a miss. Never fails: an element that does
    /// not show up yields `None`.
    pub async fn locate(&self, page: &dyn Page, xpath: &str) -> Option<ElementHandle> {
        for attempt in 1..=self.max_attempts {
            match page.evaluate_xpath(xpath).await {
                Ok(Some(element)) => {
                    debug!(xpath, attempt, "element located");
                    return Some(element);
                }
                Ok(None) => {}
                Err(e) => debug!(xpath, attempt, error = %e, "path evaluation failed"),
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }
        debug!(xpath, attempts = self.max_attempts, "element not found");
        None
    }
}
