//! URL and filename helpers.
//!
//! This module provides functions for working with result-page links,
//! direct image URLs, and the filenames derived from them.

use std::net::IpAddr;
use url::{Host, Url};

use super::constants::IMAGE_EXTENSIONS;

/// Check if a URL is valid
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
        }
        Err(_) => false,
    }
}

/// Whether the URL's host is a loopback address
///
/// Covers `127.0.0.0/8`, `::1`, `localhost` and `*.localhost`. The provider
/// occasionally hands back same-origin placeholders that point here.
#[must_use]
pub fn is_loopback_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    match parsed.host() {
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        None => false,
    }
}

/// Derive a filename from the trailing `name.ext` of a URL path
///
/// The last path segment is percent-decoded and sanitised; it is only used
/// when its extension is one of [`IMAGE_EXTENSIONS`]. Extension matching is
/// case-insensitive and the original case is preserved, so
/// `https://host/photo.JPG?x=1` yields `photo.JPG`.
///
/// Returns `None` when the name has to be derived from the content instead.
#[must_use]
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let name = sanitize_filename::sanitize(decoded);

    let (stem, _) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }

    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
        .then_some(name)
}

/// Rewrite a result-page anchor into an absolute similar-image search URL
///
/// Relative and absolute hrefs are resolved against `endpoint`. Only links on
/// the endpoint's host and path that carry a query string qualify; everything
/// else yields `None`.
#[must_use]
pub fn similar_search_url(href: &str, endpoint: &str) -> Option<String> {
    let base = Url::parse(endpoint).ok()?;
    let resolved = base.join(href.trim()).ok()?;

    if resolved.path() != base.path() {
        return None;
    }
    if resolved.host_str() != base.host_str() || resolved.port() != base.port() {
        return None;
    }

    match resolved.query() {
        Some(query) if !query.is_empty() => {
            let mut rewritten = base;
            rewritten.set_query(Some(query));
            rewritten.set_fragment(None);
            Some(rewritten.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_keeps_extension_case() {
        assert_eq!(
            filename_from_url("https://host/photo.JPG?x=1").as_deref(),
            Some("photo.JPG")
        );
        assert_eq!(
            filename_from_url("https://host/a/b/cat.jpeg#frag").as_deref(),
            Some("cat.jpeg")
        );
    }

    #[test]
    fn filename_requires_known_extension() {
        assert_eq!(filename_from_url("https://host/download.php?id=3"), None);
        assert_eq!(filename_from_url("https://host/images/"), None);
        assert_eq!(filename_from_url("https://host/.png"), None);
        assert_eq!(filename_from_url("not a url"), None);
    }

    #[test]
    fn filename_is_percent_decoded_and_sanitised() {
        assert_eq!(
            filename_from_url("https://host/my%20photo.png").as_deref(),
            Some("my photo.png")
        );
        let name = filename_from_url("https://host/a%2Fb.png").unwrap_or_default();
        assert!(!name.contains('/'));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn loopback_hosts_are_detected() {
        assert!(is_loopback_url("http://127.0.0.1/img.png"));
        assert!(is_loopback_url("http://127.4.5.6:8080/x"));
        assert!(is_loopback_url("http://[::1]/x.jpg"));
        assert!(is_loopback_url("http://localhost:3000/x.jpg"));
        assert!(is_loopback_url("http://img.localhost/x.jpg"));
        assert!(!is_loopback_url("https://example.com/127.0.0.1.jpg"));
        assert!(!is_loopback_url("https://10.0.0.1/x.jpg"));
    }

    #[test]
    fn similar_links_are_rewritten() {
        let endpoint = "https://yandex.com/images/search";
        assert_eq!(
            similar_search_url("/images/search?cbir_id=1&pos=2", endpoint).as_deref(),
            Some("https://yandex.com/images/search?cbir_id=1&pos=2")
        );
        assert_eq!(
            similar_search_url("https://yandex.com/images/search?text=cat", endpoint).as_deref(),
            Some("https://yandex.com/images/search?text=cat")
        );
        assert_eq!(similar_search_url("/images/search", endpoint), None);
        assert_eq!(similar_search_url("/images/touch/search?x=1", endpoint), None);
        assert_eq!(
            similar_search_url("https://evil.example/images/search?x=1", endpoint),
            None
        );
    }

    #[test]
    fn similar_links_follow_the_configured_endpoint() {
        let endpoint = "http://127.0.0.1:8080/images/search";
        assert_eq!(
            similar_search_url("/images/search?cbir_id=7", endpoint).as_deref(),
            Some("http://127.0.0.1:8080/images/search?cbir_id=7")
        );
        assert_eq!(
            similar_search_url("https://yandex.com/images/search?cbir_id=7", endpoint),
            None
        );
        assert_eq!(
            similar_search_url("http://127.0.0.1:9090/images/search?cbir_id=7", endpoint),
            None
        );
    }

    #[test]
    fn url_validation() {
        assert!(is_valid_url("https://example.com/a.png"));
        assert!(!is_valid_url("data:image/png;base64,AAAA"));
        assert!(!is_valid_url(""));
    }
}
