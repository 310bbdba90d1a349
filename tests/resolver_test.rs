//! Link resolver behaviour against a scripted page

use simscrape::{Candidate, CrawlError, LinkResolver, Resolution, ResolutionFailure, Resolve};

mod common;
use common::{FakePage, FakeViewer};

const CANDIDATE: &str = "https://yandex.com/images/search?rpt=imageview&cbir_id=7";

#[tokio::test]
async fn four_timeouts_drop_the_candidate() {
    let page = FakePage::new()
        .with_timeouts(CANDIDATE, 10)
        .with_viewer(CANDIDATE, FakeViewer::Single("https://img.example/a.jpg".into()));
    let resolver = LinkResolver::new(page);
    let mut candidate = Candidate::new(CANDIDATE);

    let resolution = resolver.resolve(&mut candidate).await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Failed(ResolutionFailure::Timeout { attempts: 4 })
    );
    assert_eq!(candidate.resolve_attempts, 4);
    assert_eq!(resolver.page().navigations(), 4);
}

#[tokio::test]
async fn timeouts_are_retried_until_the_page_answers() {
    let page = FakePage::new()
        .with_timeouts(CANDIDATE, 2)
        .with_viewer(CANDIDATE, FakeViewer::Single("https://img.example/a.jpg".into()));
    let resolver = LinkResolver::new(page);
    let mut candidate = Candidate::new(CANDIDATE);

    let resolution = resolver.resolve(&mut candidate).await.unwrap();

    match resolution {
        Resolution::Resolved(image) => assert_eq!(image.url, "https://img.example/a.jpg"),
        other => panic!("expected a resolved image, got {other:?}"),
    }
    assert_eq!(candidate.resolve_attempts, 3);
}

#[tokio::test]
async fn attempt_budget_is_configurable() {
    let page = FakePage::new().with_timeouts(CANDIDATE, 10);
    let resolver = LinkResolver::new(page).with_max_attempts(2);
    let mut candidate = Candidate::new(CANDIDATE);

    let resolution = resolver.resolve(&mut candidate).await.unwrap();

    assert_eq!(
        resolution,
        Resolution::Failed(ResolutionFailure::Timeout { attempts: 2 })
    );
    assert_eq!(resolver.page().navigations(), 2);
}

#[tokio::test]
async fn dropdown_picks_the_largest_size() {
    let page = FakePage::new().with_viewer(
        CANDIDATE,
        FakeViewer::Sizes(vec![
            ("640×480".into(), "https://img.example/small.jpg".into()),
            ("1920×1080".into(), "https://img.example/large.jpg".into()),
            ("1280 x 720".into(), "https://img.example/medium.jpg".into()),
        ]),
    );
    let resolver = LinkResolver::new(page);
    let mut candidate = Candidate::new(CANDIDATE);

    match resolver.resolve(&mut candidate).await.unwrap() {
        Resolution::Resolved(image) => assert_eq!(image.url, "https://img.example/large.jpg"),
        other => panic!("expected a resolved image, got {other:?}"),
    }
    assert_eq!(candidate.resolve_attempts, 1);
}

#[tokio::test]
async fn dropdown_without_parseable_sizes_is_empty() {
    let page = FakePage::new().with_viewer(
        CANDIDATE,
        FakeViewer::Sizes(vec![("original".into(), "https://img.example/a.jpg".into())]),
    );
    let resolver = LinkResolver::new(page);
    let mut candidate = Candidate::new(CANDIDATE);

    assert_eq!(
        resolver.resolve(&mut candidate).await.unwrap(),
        Resolution::Empty
    );
}

#[tokio::test]
async fn page_without_controls_is_empty() {
    let resolver = LinkResolver::new(FakePage::new());
    let mut candidate = Candidate::new(CANDIDATE);

    assert_eq!(
        resolver.resolve(&mut candidate).await.unwrap(),
        Resolution::Empty
    );
}

#[tokio::test]
async fn closed_browser_is_fatal() {
    let page = FakePage::new().with_closed_session_on(CANDIDATE);
    let resolver = LinkResolver::new(page);
    let mut candidate = Candidate::new(CANDIDATE);

    let err = resolver.resolve(&mut candidate).await.unwrap_err();
    assert!(matches!(err, CrawlError::Session(_)));
    assert_eq!(resolver.page().navigations(), 1);
}
