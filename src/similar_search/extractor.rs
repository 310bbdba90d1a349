//! Candidate link extraction from the similar-images listing

use std::collections::HashSet;
use tracing::{debug, info};

use super::types::{CANDIDATE_LINK_SELECTOR, SIMILAR_IMAGES_TAB_SELECTOR};
use crate::crawl_engine::Candidate;
use crate::page::{PageElement, PageError, SearchPage};
use crate::utils::similar_search_url;

/// Switch the result page to its "similar images" tab and wait for it to settle
pub async fn open_similar_listing<P: SearchPage + ?Sized>(page: &P) -> Result<(), PageError> {
    page.wait_for_selector(SIMILAR_IMAGES_TAB_SELECTOR).await?;
    page.click(SIMILAR_IMAGES_TAB_SELECTOR).await?;
    page.wait_for_network_idle().await?;
    debug!("Similar-images listing loaded");
    Ok(())
}

/// Rewrite anchors into absolute similar-search URLs on `endpoint`
///
/// Keeps document order and drops exact-string repeats. Anchors pointing
/// anywhere other than the endpoint's image search are ignored.
#[must_use]
pub fn candidate_urls(elements: &[PageElement], endpoint: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    elements
        .iter()
        .filter_map(PageElement::href)
        .filter_map(|href| similar_search_url(href, endpoint))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Collect the ordered, de-duplicated candidates from a loaded listing
pub async fn extract_candidates<P: SearchPage + ?Sized>(
    page: &P,
    endpoint: &str,
) -> Result<Vec<Candidate>, PageError> {
    let anchors = page.query_all(CANDIDATE_LINK_SELECTOR).await?;
    let candidates: Vec<Candidate> = candidate_urls(&anchors, endpoint)
        .into_iter()
        .map(Candidate::new)
        .collect();

    info!(
        "Extracted {} candidates from {} anchors",
        candidates.len(),
        anchors.len()
    );
    Ok(candidates)
}
