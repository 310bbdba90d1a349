//! Download worker against a local mock HTTP server

use mockito::{Matcher, Server};
use std::sync::Arc;
use tempfile::TempDir;

use simscrape::crawl_engine::CrawlState;
use simscrape::downloader::{http_client, md5_hex};
use simscrape::{
    DedupMode, DownloadFailure, DownloadOutcome, DownloadWorker, DuplicateDetector,
    ImageDownloader, ImageStore, ResolvedImage, SimilarityThresholds, SkipReason,
};

mod common;
use common::{TINTS, noise_image, png_bytes};

fn worker(dir: &TempDir, detector: DuplicateDetector) -> DownloadWorker {
    let store = Arc::new(ImageStore::open(dir.path()).unwrap());
    DownloadWorker::new(http_client(10).unwrap(), store, Arc::new(detector)).allow_loopback(true)
}

fn stored(dir: &TempDir) -> Vec<String> {
    let mut names = ImageStore::open(dir.path()).unwrap().filenames().unwrap();
    names.sort();
    names
}

#[tokio::test]
async fn named_image_keeps_its_case_and_is_written_once() {
    let mut server = Server::new_async().await;
    let body = png_bytes(&noise_image(TINTS[0], 1));
    let mock = server
        .mock("GET", "/photo.JPG")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(body.clone())
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());
    let url = format!("{}/photo.JPG?x=1", server.url());

    let outcome = worker
        .download(ResolvedImage::new(&url), CrawlState::new(4))
        .await;

    mock.assert_async().await;
    assert_eq!(
        outcome,
        DownloadOutcome::Accepted {
            url,
            filename: "photo.JPG".into(),
            byte_size: body.len() as u64,
        }
    );
    assert_eq!(stored(&dir), vec!["photo.JPG".to_string()]);
    assert_eq!(std::fs::read(dir.path().join("photo.JPG")).unwrap(), body);
}

#[tokio::test]
async fn non_200_writes_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/missing.png")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());
    let state = CrawlState::new(4);

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/missing.png", server.url())),
            Arc::clone(&state),
        )
        .await;

    mock.assert_async().await;
    assert!(matches!(
        outcome,
        DownloadOutcome::Failed {
            failure: DownloadFailure::HttpStatus(404),
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
    assert_eq!(state.accepted(), 0);
}

#[tokio::test]
async fn loopback_hosts_are_skipped_without_fetching() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(ImageStore::open(dir.path()).unwrap());
    let worker = DownloadWorker::new(
        http_client(10).unwrap(),
        store,
        Arc::new(DuplicateDetector::disabled()),
    );

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/a.png", server.url())),
            CrawlState::new(4),
        )
        .await;

    mock.assert_async().await;
    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped {
            reason: SkipReason::LocalhostRedirect,
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
}

#[tokio::test]
async fn existing_name_is_skipped_before_fetching() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/a.png")
        .expect(0)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.png"), b"old").unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());
    let state = CrawlState::new(1);

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/a.png", server.url())),
            Arc::clone(&state),
        )
        .await;

    mock.assert_async().await;
    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped {
            reason: SkipReason::AlreadyExists,
            ..
        }
    ));
    // Already-present files do not use up the quota
    assert_eq!(state.accepted(), 0);
    assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"old");
}

#[tokio::test]
async fn unnamed_image_is_named_after_its_content() {
    let mut server = Server::new_async().await;
    let body = png_bytes(&noise_image(TINTS[1], 2));
    server
        .mock("GET", "/img")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body.clone())
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/img?id=3", server.url())),
            CrawlState::new(4),
        )
        .await;

    let expected = format!("{}.png", md5_hex(&body));
    match outcome {
        DownloadOutcome::Accepted { filename, .. } => assert_eq!(filename, expected),
        other => panic!("expected acceptance, got {other:?}"),
    }
    assert_eq!(stored(&dir), vec![expected]);
}

#[tokio::test]
async fn html_behind_an_image_name_is_not_an_image() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/fake.jpg")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body("<html>blocked</html>")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/fake.jpg", server.url())),
            CrawlState::new(4),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped {
            reason: SkipReason::NotAnImage,
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
}

#[tokio::test]
async fn unsniffable_unnamed_body_is_unreadable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/blob")
        .with_status(200)
        .with_body("definitely not an image")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/blob", server.url())),
            CrawlState::new(4),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped {
            reason: SkipReason::Unreadable,
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
}

#[tokio::test]
async fn oversized_body_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/big.png")
        .with_status(200)
        .with_body(vec![0u8; 4096])
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled()).with_max_image_size(1024);

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/big.png", server.url())),
            CrawlState::new(4),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Failed {
            failure: DownloadFailure::TooLarge(_),
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
}

#[tokio::test]
async fn copy_of_the_query_image_is_a_duplicate() {
    let query = noise_image(TINTS[2], 3);
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/copy.png")
        .with_status(200)
        .with_body(png_bytes(&query))
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let detector =
        DuplicateDetector::new(DedupMode::Full, SimilarityThresholds::default()).with_query(&query);
    let worker = worker(&dir, detector);
    let state = CrawlState::new(4);

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/copy.png", server.url())),
            Arc::clone(&state),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped {
            reason: SkipReason::Duplicate,
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
    assert_eq!(state.accepted(), 0);
}

#[tokio::test]
async fn second_copy_under_another_name_is_a_duplicate() {
    let picture = noise_image(TINTS[3], 4);
    let body = png_bytes(&picture);
    let mut server = Server::new_async().await;
    for path in ["/first.png", "/second.png"] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body(body.clone())
            .create_async()
            .await;
    }

    let dir = TempDir::new().unwrap();
    let detector = DuplicateDetector::new(DedupMode::Full, SimilarityThresholds::default())
        .with_query(&noise_image(TINTS[4], 5));
    let worker = worker(&dir, detector);
    let state = CrawlState::new(4);

    let first = worker
        .download(
            ResolvedImage::new(format!("{}/first.png", server.url())),
            Arc::clone(&state),
        )
        .await;
    let second = worker
        .download(
            ResolvedImage::new(format!("{}/second.png", server.url())),
            Arc::clone(&state),
        )
        .await;

    assert!(first.is_accepted());
    assert!(matches!(
        second,
        DownloadOutcome::Skipped {
            reason: SkipReason::Duplicate,
            ..
        }
    ));
    assert_eq!(stored(&dir), vec!["first.png".to_string()]);
    assert_eq!(state.accepted(), 1);
}

#[tokio::test]
async fn nothing_is_written_once_the_quota_is_met() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/late.png")
        .with_status(200)
        .with_body(png_bytes(&noise_image(TINTS[5], 6)))
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let worker = worker(&dir, DuplicateDetector::disabled());
    let state = CrawlState::new(1);
    state.try_reserve().unwrap().commit();

    let outcome = worker
        .download(
            ResolvedImage::new(format!("{}/late.png", server.url())),
            Arc::clone(&state),
        )
        .await;

    assert!(matches!(
        outcome,
        DownloadOutcome::Skipped {
            reason: SkipReason::QuotaReached,
            ..
        }
    ));
    assert!(stored(&dir).is_empty());
    assert_eq!(state.accepted(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_copies_are_accepted_once() {
    let body = png_bytes(&noise_image(TINTS[6], 9));
    let mut server = Server::new_async().await;
    for i in 0..6 {
        server
            .mock("GET", format!("/copy{i}.png").as_str())
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(body.clone())
            .create_async()
            .await;
    }

    let dir = TempDir::new().unwrap();
    let detector = DuplicateDetector::new(DedupMode::Full, SimilarityThresholds::default())
        .with_query(&noise_image(TINTS[0], 10));
    let worker = Arc::new(worker(&dir, detector));
    let state = CrawlState::new(6);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..6 {
        let worker = Arc::clone(&worker);
        let state = Arc::clone(&state);
        let url = format!("{}/copy{i}.png", server.url());
        tasks.spawn(async move { worker.download(ResolvedImage::new(url), state).await });
    }

    let mut accepted = 0;
    let mut duplicates = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            DownloadOutcome::Accepted { .. } => accepted += 1,
            DownloadOutcome::Skipped {
                reason: SkipReason::Duplicate,
                ..
            } => duplicates += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 5);
    assert_eq!(state.accepted(), 1);
    assert_eq!(stored(&dir).len(), 1);
}
