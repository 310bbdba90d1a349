//! Resolve a candidate result page to its largest direct image URL

use async_trait::async_trait;
use tracing::{debug, warn};

use super::types::{OPEN_BUTTON_SELECTOR, RESOLUTION_DROPDOWN_SELECTOR, RESOLUTION_OPTION_SELECTOR};
use crate::crawl_engine::{
    Candidate, CrawlError, CrawlResult, Resolution, ResolutionFailure, ResolvedImage,
};
use crate::page::{PageElement, PageError, SearchPage};
use crate::utils::constants::DEFAULT_MAX_RESOLVE_ATTEMPTS;
use crate::utils::is_valid_url;

/// Turns a candidate into a [`Resolution`]
///
/// Called serially from the coordinating task. An `Err` is fatal for the whole
/// crawl; per-candidate problems are reported as `Resolution::Failed`.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, candidate: &mut Candidate) -> CrawlResult<Resolution>;
}

/// Parse a size label such as `1920×1080`, `800 x 600` or `640X480`
#[must_use]
pub fn parse_resolution_label(label: &str) -> Option<(u64, u64)> {
    let (width, height) = label
        .split_once('×')
        .or_else(|| label.split_once('x'))
        .or_else(|| label.split_once('X'))?;
    let width = width.trim().parse::<u64>().ok()?;
    let height = height.trim().parse::<u64>().ok()?;
    Some((width, height))
}

/// Href of the option with the strictly largest area; ties keep the first seen
#[must_use]
pub fn best_resolution(options: &[PageElement]) -> Option<String> {
    let mut best: Option<(u64, &str)> = None;
    for option in options {
        let Some((width, height)) = parse_resolution_label(&option.text) else {
            debug!("Ignoring unparseable size label '{}'", option.text);
            continue;
        };
        let Some(href) = option.href() else {
            continue;
        };
        let area = width.saturating_mul(height);
        if best.is_none_or(|(largest, _)| area > largest) {
            best = Some((area, href));
        }
    }
    best.map(|(_, href)| href.to_string())
}

/// Browser-driven resolver over a single [`SearchPage`]
pub struct LinkResolver<P> {
    page: P,
    max_attempts: u32,
}

impl<P: SearchPage> LinkResolver<P> {
    #[must_use]
    pub fn new(page: P) -> Self {
        Self {
            page,
            max_attempts: DEFAULT_MAX_RESOLVE_ATTEMPTS,
        }
    }

    /// Total attempts per candidate (at least one)
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn page(&self) -> &P {
        &self.page
    }

    /// One navigation + inspection of the candidate page
    async fn attempt(&self, url: &str) -> Result<Option<String>, PageError> {
        self.page.navigate(url).await?;
        self.page.wait_for_network_idle().await?;

        if self.page.exists(RESOLUTION_DROPDOWN_SELECTOR).await? {
            self.page.click(RESOLUTION_DROPDOWN_SELECTOR).await?;
            let options = self.page.query_all(RESOLUTION_OPTION_SELECTOR).await?;
            debug!("{} size options offered for {url}", options.len());
            return Ok(best_resolution(&options));
        }

        let open = self.page.query_all(OPEN_BUTTON_SELECTOR).await?;
        Ok(open.iter().find_map(PageElement::href).map(str::to_string))
    }
}

#[async_trait]
impl<P: SearchPage> Resolve for LinkResolver<P> {
    async fn resolve(&self, candidate: &mut Candidate) -> CrawlResult<Resolution> {
        loop {
            candidate.resolve_attempts += 1;

            match self.attempt(&candidate.url).await {
                Ok(Some(url)) if is_valid_url(&url) => {
                    return Ok(Resolution::Resolved(ResolvedImage::new(url)));
                }
                Ok(Some(url)) => {
                    debug!("Ignoring non-http image link '{url}' on {}", candidate.url);
                    return Ok(Resolution::Empty);
                }
                Ok(None) => {
                    debug!("No image offered on {}", candidate.url);
                    return Ok(Resolution::Empty);
                }
                Err(PageError::SessionClosed(msg)) => return Err(CrawlError::Session(msg)),
                Err(e) if e.is_timeout() => {
                    if candidate.resolve_attempts >= self.max_attempts {
                        warn!(
                            "Giving up on {} after {} timed-out attempts",
                            candidate.url, candidate.resolve_attempts
                        );
                        return Ok(Resolution::Failed(ResolutionFailure::Timeout {
                            attempts: candidate.resolve_attempts,
                        }));
                    }
                    debug!(
                        "Attempt {}/{} for {} timed out: {e}",
                        candidate.resolve_attempts, self.max_attempts, candidate.url
                    );
                }
                Err(e) => {
                    warn!("Failed to resolve {}: {e}", candidate.url);
                    return Ok(Resolution::Failed(ResolutionFailure::Page {
                        message: e.to_string(),
                    }));
                }
            }
        }
    }
}
