//! Narrow browser-page capability used by the extractor and the resolver
//!
//! The crawl core never sees a concrete browser type. Everything it needs
//! from a rendered page goes through [`SearchPage`].

pub mod chromium;
pub mod page_timeout;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use chromium::ChromiumPage;
pub use page_timeout::with_page_timeout;

/// Errors raised by page operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    /// The page did not settle in time; the caller may retry
    #[error("{operation} timeout after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// Browser or CDP connection is gone; nothing on this session will work again
    #[error("Browser session closed: {0}")]
    SessionClosed(String),

    /// Any other browser-side failure (missing element, script error, ...)
    #[error("Browser error: {0}")]
    Browser(String),
}

impl PageError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::Timeout { .. })
    }

    #[must_use]
    pub fn is_session_closed(&self) -> bool {
        matches!(self, PageError::SessionClosed(_))
    }
}

/// Snapshot of a DOM element: its attributes and text content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageElement {
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub text: String,
}

impl PageElement {
    /// Build an anchor element with the given `href`
    #[must_use]
    pub fn anchor(href: impl Into<String>) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("href".to_string(), href.into());
        Self {
            attributes,
            text: String::new(),
        }
    }

    /// Builder-style text setter
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn href(&self) -> Option<&str> {
        self.attribute("href").filter(|h| !h.is_empty())
    }
}

/// Operations the crawl needs from a rendered page
///
/// One page is one navigation context: implementations are driven by a single
/// coordinating task and never used concurrently.
#[async_trait]
pub trait SearchPage: Send + Sync {
    /// Navigate to `url` and wait for the navigation to commit
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Wait until the page has stopped loading resources
    async fn wait_for_network_idle(&self) -> Result<(), PageError>;

    /// Wait until `selector` matches at least one element
    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError>;

    /// Whether `selector` currently matches anything
    async fn exists(&self, selector: &str) -> Result<bool, PageError>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> Result<(), PageError>;

    /// Snapshot every element matching `selector`, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<PageElement>, PageError>;
}
