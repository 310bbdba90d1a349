//! Test utilities shared by the simscrape integration tests

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use simscrape::crawl_engine::CrawlState;
use simscrape::similar_search::types::{
    CANDIDATE_LINK_SELECTOR, OPEN_BUTTON_SELECTOR, RESOLUTION_DROPDOWN_SELECTOR,
    RESOLUTION_OPTION_SELECTOR,
};
use simscrape::{
    Candidate, CrawlError, CrawlResult, DownloadOutcome, ImageDownloader, PageElement, PageError,
    Resolution, ResolvedImage, Resolve, SearchPage, SkipReason,
};

/// Distinct colour casts for fixture images
#[allow(dead_code)]
pub const TINTS: [[u8; 3]; 7] = [
    [20, 20, 150],
    [150, 20, 20],
    [20, 150, 20],
    [150, 150, 20],
    [20, 150, 150],
    [150, 20, 150],
    [80, 80, 80],
];

/// 64x64 tinted noise; different seeds and tints give unrelated pictures
#[allow(dead_code)]
pub fn noise_image(tint: [u8; 3], seed: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut next = move || {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        ((state >> 16) & 0xff) as u8
    };

    let img = RgbImage::from_fn(64, 64, |_, _| {
        Rgb([
            tint[0].saturating_add(next() / 4).max(1),
            tint[1].saturating_add(next() / 4).max(1),
            tint[2].saturating_add(next() / 4).max(1),
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Encode an image as PNG bytes
#[allow(dead_code)]
pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("png encoding");
    out.into_inner()
}

/// What a fake result page shows once navigated to
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum FakeViewer {
    /// Size dropdown with `(label, href)` options
    Sizes(Vec<(String, String)>),
    /// Single "open" button
    Single(String),
    /// No image controls at all
    Blank,
}

/// Scripted in-memory [`SearchPage`]
#[allow(dead_code)]
#[derive(Default)]
pub struct FakePage {
    anchors: Vec<PageElement>,
    viewers: HashMap<String, FakeViewer>,
    timeouts: Mutex<HashMap<String, u32>>,
    closed_on: Option<String>,
    current: Mutex<String>,
    navigations: AtomicUsize,
}

#[allow(dead_code)]
impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors returned for the listing selector
    pub fn with_anchors(mut self, hrefs: &[&str]) -> Self {
        self.anchors = hrefs.iter().map(|h| PageElement::anchor(*h)).collect();
        self
    }

    pub fn with_viewer(mut self, url: &str, viewer: FakeViewer) -> Self {
        self.viewers.insert(url.to_string(), viewer);
        self
    }

    /// The next `count` navigations to `url` time out
    pub fn with_timeouts(self, url: &str, count: u32) -> Self {
        self.timeouts.lock().insert(url.to_string(), count);
        self
    }

    /// Navigating to `url` reports a dead browser
    pub fn with_closed_session_on(mut self, url: &str) -> Self {
        self.closed_on = Some(url.to_string());
        self
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    fn viewer(&self) -> FakeViewer {
        self.viewers
            .get(self.current.lock().as_str())
            .cloned()
            .unwrap_or(FakeViewer::Blank)
    }
}

#[async_trait]
impl SearchPage for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        if self.closed_on.as_deref() == Some(url) {
            return Err(PageError::SessionClosed("browser closed".into()));
        }
        if let Some(left) = self.timeouts.lock().get_mut(url)
            && *left > 0
        {
            *left -= 1;
            return Err(PageError::Timeout {
                operation: "Navigation".into(),
                secs: 30,
            });
        }
        *self.current.lock() = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> Result<(), PageError> {
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        Ok(selector == RESOLUTION_DROPDOWN_SELECTOR
            && matches!(self.viewer(), FakeViewer::Sizes(_)))
    }

    async fn click(&self, _selector: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<PageElement>, PageError> {
        if selector == CANDIDATE_LINK_SELECTOR {
            return Ok(self.anchors.clone());
        }
        let elements = match (self.viewer(), selector) {
            (FakeViewer::Sizes(options), RESOLUTION_OPTION_SELECTOR) => options
                .into_iter()
                .map(|(label, href)| PageElement::anchor(href).with_text(label))
                .collect(),
            (FakeViewer::Single(href), OPEN_BUTTON_SELECTOR) => vec![PageElement::anchor(href)],
            _ => Vec::new(),
        };
        Ok(elements)
    }
}

/// Resolver answering from a fixed table; unknown candidates resolve to nothing
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedResolver {
    answers: HashMap<String, Result<Resolution, CrawlError>>,
    calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolves(mut self, candidate: &str, image_url: &str) -> Self {
        self.answers.insert(
            candidate.to_string(),
            Ok(Resolution::Resolved(ResolvedImage::new(image_url))),
        );
        self
    }

    pub fn answers(mut self, candidate: &str, answer: Result<Resolution, CrawlError>) -> Self {
        self.answers.insert(candidate.to_string(), answer);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Resolve for ScriptedResolver {
    async fn resolve(&self, candidate: &mut Candidate) -> CrawlResult<Resolution> {
        candidate.resolve_attempts += 1;
        self.calls.lock().push(candidate.url.clone());
        self.answers
            .get(&candidate.url)
            .cloned()
            .unwrap_or(Ok(Resolution::Empty))
    }
}

/// Downloader that "saves" after a delay without touching the network
///
/// URLs containing `dup` are reported as duplicates.
#[allow(dead_code)]
pub struct FakeDownloader {
    delay: Duration,
    started: AtomicUsize,
}

#[allow(dead_code)]
impl FakeDownloader {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDownloader for FakeDownloader {
    async fn download(&self, image: ResolvedImage, state: Arc<CrawlState>) -> DownloadOutcome {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if image.url.contains("dup") {
            return DownloadOutcome::skipped(image.url, SkipReason::Duplicate);
        }
        let Some(slot) = state.try_reserve() else {
            return DownloadOutcome::skipped(image.url, SkipReason::QuotaReached);
        };
        slot.commit();

        let filename = image
            .url
            .rsplit('/')
            .next()
            .unwrap_or("image.png")
            .to_string();
        DownloadOutcome::Accepted {
            url: image.url,
            filename,
            byte_size: 1,
        }
    }
}

/// Candidate URLs `https://yandex.com/images/search?rpt=imageview&cbir_id=<n>`
#[allow(dead_code)]
pub fn candidate_url(n: usize) -> String {
    format!("https://yandex.com/images/search?rpt=imageview&cbir_id={n}")
}
