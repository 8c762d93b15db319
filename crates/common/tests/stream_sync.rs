//! Integration tests for a photo stream bound to a remote listing

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::prelude::*;
use common::sync::RetryPolicy;
use tempfile::TempDir;
use tokio::sync::watch;

fn config() -> SyncConfig {
    SyncConfig {
        page_size: 2,
        retry: RetryPolicy::new(3, Duration::ZERO),
        interval: None,
    }
}

#[tokio::test]
async fn test_bound_stream_populates_namespace() {
    let temp = TempDir::new().unwrap();
    let photos = vec![
        support::photo("101", "Sunset"),
        support::photo("102", "Sunset"),
        support::photo("103", ""),
        support::photo("104", "Beach/Day"),
        support::photo("105", "Sunset"),
    ];
    let client = support::content_for(&photos);
    let source = support::MemorySource::new(photos);
    let (stream, _cache) = support::setup_stream(client.clone(), &temp.path().join("cache.db")).await;

    let (_shutdown_tx, shutdown_rx) = watch::channel(());
    let handle = stream.bind(source.clone(), config(), shutdown_rx).unwrap();
    let outcome = handle.wait_for_passes(1).await.unwrap();
    assert_eq!(
        outcome,
        PassOutcome::Completed {
            discovered: 5,
            sized: 5
        }
    );
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);

    let namespace = stream.namespace();
    assert_eq!(
        namespace.list_children("/").unwrap(),
        vec!["tags", "sets", "date", "stream"]
    );
    assert_eq!(
        namespace.list_children("/stream").unwrap(),
        vec![
            "Sunset.jpg",
            "Sunset 001.jpg",
            "2019-07-14.jpg",
            "Beach_Day.jpg",
            "Sunset 002.jpg"
        ]
    );

    let attrs = stream.get_attributes("/stream/Beach_Day.jpg").unwrap();
    assert_eq!(attrs.perm, 0o755);
    assert_eq!(attrs.size, "image data for 104".len() as u64);
    assert_eq!(client.fetches.load(Ordering::SeqCst), 0);

    handle.join().await;
}

#[tokio::test]
async fn test_reads_are_served_from_cache() {
    let temp = TempDir::new().unwrap();
    let photos = vec![support::photo("1", "Harbor")];
    let client = support::content_for(&photos);
    let (stream, cache) = support::setup_stream(client.clone(), &temp.path().join("cache.db")).await;
    stream.on_discovered(photos[0].clone()).unwrap();

    let data = stream.read("Harbor.jpg", 0, 4096).await.unwrap();
    assert_eq!(&data[..], b"image data for 1");
    let tail = stream.read("Harbor.jpg", 11, 4096).await.unwrap();
    assert_eq!(&tail[..], b"for 1");

    assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    assert!(cache.contains("1").await);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let temp = TempDir::new().unwrap();
    let cache_path = temp.path().join("cache.db");
    let photos = vec![support::photo("7", "Lighthouse")];

    {
        let client = support::content_for(&photos);
        let (stream, cache) = support::setup_stream(client.clone(), &cache_path).await;
        stream.on_discovered(photos[0].clone()).unwrap();
        stream.read("Lighthouse.jpg", 0, 64).await.unwrap();
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
        cache.close().await;
    }

    let client = support::content_for(&photos);
    let (stream, cache) = support::setup_stream(client.clone(), &cache_path).await;
    stream.on_discovered(photos[0].clone()).unwrap();
    let data = stream.read("Lighthouse.jpg", 0, 64).await.unwrap();
    assert_eq!(&data[..], b"image data for 7");
    assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    cache.close().await;
}

#[tokio::test]
async fn test_missing_remote_content() {
    let temp = TempDir::new().unwrap();
    let photos = vec![support::photo("9", "Gone")];
    let client = Arc::new(support::MemoryContent::default());
    let (stream, cache) = support::setup_stream(client, &temp.path().join("cache.db")).await;
    stream.on_discovered(photos[0].clone()).unwrap();

    let err = stream.read("Gone.jpg", 0, 10).await.unwrap_err();
    assert!(matches!(
        err,
        StreamError::Fetch(FetchError::RemoteStatus { status: 404, .. })
    ));
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_shutdown_stops_periodic_sync() {
    let temp = TempDir::new().unwrap();
    let photos = vec![support::photo("1", "a"), support::photo("2", "b")];
    let client = support::content_for(&photos);
    let source = support::MemorySource::new(photos);
    let (stream, _cache) = support::setup_stream(client, &temp.path().join("cache.db")).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let mut config = config();
    config.interval = Some(Duration::from_secs(3600));
    let handle = stream.bind(source, config, shutdown_rx).unwrap();
    handle.wait_for_passes(1).await.unwrap();

    handle.request_resync().unwrap();
    handle.wait_for_passes(2).await.unwrap();
    assert_eq!(stream.len(), 2);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .unwrap();
}
