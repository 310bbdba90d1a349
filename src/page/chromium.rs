//! `SearchPage` implementation backed by a chromiumoxide page
//!
//! DOM queries are answered by a single `evaluate()` round-trip that returns
//! plain JSON snapshots, so no `Element` handles outlive the call.

use async_trait::async_trait;
use chromiumoxide::Page;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::page_timeout::with_page_timeout;
use super::{PageElement, PageError, SearchPage};

/// How long the resource count has to stay flat before the page counts as idle
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// Interval between DOM polls
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Map a chromiumoxide error onto [`PageError`]
///
/// Based on the error patterns chromiumoxide produces once the browser
/// process or its websocket is gone.
fn classify_error(error: impl std::fmt::Display) -> PageError {
    let message = error.to_string();
    let lower = message.to_lowercase();

    if lower.contains("browser closed")
        || lower.contains("browser disconnected")
        || lower.contains("target closed")
        || lower.contains("session closed")
        || lower.contains("session not found")
        || lower.contains("no response from the chromium instance")
        || lower.contains("channel")
        || lower.contains("websocket")
    {
        return PageError::SessionClosed(message);
    }

    if lower.contains("timeout") || lower.contains("timed out") {
        return PageError::Timeout {
            operation: "CDP request".to_string(),
            secs: 0,
        };
    }

    PageError::Browser(message)
}

/// Encode a CSS selector as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Browser page adapter
#[derive(Debug, Clone)]
pub struct ChromiumPage {
    page: Page,
    navigation_timeout_secs: u64,
    idle_timeout_secs: u64,
}

impl ChromiumPage {
    #[must_use]
    pub fn new(page: Page, navigation_timeout_secs: u64, idle_timeout_secs: u64) -> Self {
        Self {
            page,
            navigation_timeout_secs,
            idle_timeout_secs,
        }
    }

    /// Underlying chromiumoxide page
    #[must_use]
    pub fn inner(&self) -> &Page {
        &self.page
    }

    /// Current page URL, empty if unknown
    pub async fn current_url(&self) -> String {
        self.page.url().await.ok().flatten().unwrap_or_default()
    }

    async fn evaluate_json(&self, script: String) -> Result<serde_json::Value, PageError> {
        let result = self.page.evaluate(script).await.map_err(classify_error)?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| PageError::Browser(format!("Failed to read script result: {e}")))
    }

    /// Snapshot of `document.readyState` and the number of resources fetched so far
    async fn load_state(&self) -> Result<(bool, u64), PageError> {
        let value = self
            .evaluate_json(
                r"(() => ({
                    complete: document.readyState === 'complete',
                    resources: performance.getEntriesByType('resource').length
                }))()"
                    .to_string(),
            )
            .await?;

        let complete = value
            .get("complete")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let resources = value
            .get("resources")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        Ok((complete, resources))
    }
}

#[async_trait]
impl SearchPage for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        debug!("Navigating to {url}");
        with_page_timeout(
            async {
                self.page.goto(url).await.map_err(classify_error)?;
                Ok(())
            },
            self.navigation_timeout_secs,
            "Navigation",
        )
        .await
    }

    async fn wait_for_network_idle(&self) -> Result<(), PageError> {
        with_page_timeout(
            async {
                let start = Instant::now();
                let mut last_count = None;
                let mut quiet_since = Instant::now();

                loop {
                    let (complete, count) = self.load_state().await?;
                    if last_count != Some(count) {
                        last_count = Some(count);
                        quiet_since = Instant::now();
                    } else if complete && quiet_since.elapsed() >= NETWORK_QUIET_WINDOW {
                        trace!(
                            "Network idle after {:.2}s ({count} resources)",
                            start.elapsed().as_secs_f64()
                        );
                        return Ok(());
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            },
            self.idle_timeout_secs,
            "Network idle wait",
        )
        .await
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError> {
        with_page_timeout(
            async {
                loop {
                    if self.exists(selector).await? {
                        return Ok(());
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            },
            self.idle_timeout_secs,
            "Selector wait",
        )
        .await
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        let value = self.evaluate_json(script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(classify_error)?;
        element.click().await.map_err(classify_error)?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<PageElement>, PageError> {
        let script = format!(
            r"(() => Array.from(document.querySelectorAll({})).map(e => ({{
                attributes: Object.fromEntries(Array.from(e.attributes).map(a => [a.name, a.value])),
                text: (e.textContent || '').trim()
            }})))()",
            js_string(selector)
        );
        let value = self.evaluate_json(script).await?;
        serde_json::from_value(value)
            .map_err(|e| PageError::Browser(format!("Failed to parse elements for '{selector}': {e}")))
    }
}
