mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeRecorder, FakeSource, FakeToolkit, eventually, stream};
use timeline::Timeline;
use tokio_util::sync::CancellationToken;
use twitch_recorder::twitch::BroadcastState;
use twitch_recorder::{AppConfig, SessionRecorder};

fn config(storage: &std::path::Path) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        storage_dir: storage.to_path_buf(),
        stream_poll_interval_secs: 1,
        metadata_poll_interval_secs: 1,
        ..AppConfig::default()
    })
}

fn files_with_extension(dir: &std::path::Path, extension: &str) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    files
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_live_session_is_recorded_and_finalized() {
    let storage = tempfile::tempdir().unwrap();
    let config = config(storage.path());
    let source = FakeSource::new(vec![
        BroadcastState::AuthExpired,
        BroadcastState::Live(stream("Just Chatting", "Hello")),
        // First sample taken by the metadata poller.
        BroadcastState::Live(stream("Just Chatting", "Hello")),
    ]);
    let recorder = FakeRecorder::new(source.clone(), 3);
    let toolkit = FakeToolkit::new(60.0);
    let session = Arc::new(SessionRecorder::new(
        config.clone(),
        "someone",
        source.clone(),
        recorder.clone(),
        toolkit.clone(),
    ));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move { session.run(cancel).await }
    });

    let processed = config.processed_dir("someone");
    assert!(eventually(|| !files_with_extension(&processed, "mp4").is_empty()).await);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // Initial login plus one retry after the expired token.
    assert_eq!(source.refreshes(), 2);
    assert_eq!(recorder.recordings.lock().len(), 1);

    let recorded = config.recorded_dir("someone");
    assert!(files_with_extension(&recorded, "mp4").is_empty());
    assert!(files_with_extension(&recorded, "json").is_empty());

    let timelines = files_with_extension(&processed, "json");
    assert_eq!(timelines.len(), 1);
    let name = timelines[0].file_stem().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("someone-"));
    assert!(name.ends_with("-40123456789"));

    let timeline = Timeline::load(&timelines[0]).unwrap();
    assert_eq!(timeline.id.as_deref(), Some("40123456789"));
    assert_eq!(timeline.author.as_deref(), Some("SomeOne"));
    assert_eq!(timeline.current_category(), Some("Just Chatting"));
    assert_eq!(timeline.current_title(), Some("Hello"));
    assert!(timeline.window().is_some());

    let merged = toolkit.merged_metadata.lock().clone();
    assert_eq!(merged.len(), 1);
    assert!(merged[0].contains("[CHAPTER]\nTIMEBASE=1/1000\nSTART=0\n"));
    assert!(merged[0].contains("title=Just Chatting\n"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_recording_keeps_files_for_later() {
    let storage = tempfile::tempdir().unwrap();
    let config = config(storage.path());
    let source = FakeSource::new(vec![BroadcastState::Live(stream("Chess", "Openings"))]);
    let recorder = FakeRecorder::new(source.clone(), usize::MAX);
    let toolkit = FakeToolkit::new(60.0);
    let session = Arc::new(SessionRecorder::new(
        config.clone(),
        "someone",
        source.clone(),
        recorder.clone(),
        toolkit.clone(),
    ));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move { session.run(cancel).await }
    });

    assert!(eventually(|| !recorder.recordings.lock().is_empty()).await);
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(recorder.cancelled.load(Ordering::SeqCst));
    let recorded = config.recorded_dir("someone");
    assert_eq!(files_with_extension(&recorded, "mp4").len(), 1);
    assert_eq!(files_with_extension(&recorded, "json").len(), 1);
    assert!(files_with_extension(&config.processed_dir("someone"), "mp4").is_empty());
    assert!(toolkit.merged_metadata.lock().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_observation_errors_do_not_stop_watching() {
    let storage = tempfile::tempdir().unwrap();
    let config = config(storage.path());
    let source = FakeSource::new(vec![
        BroadcastState::TransportError("connection reset".to_string()),
        BroadcastState::ClientError("400 Bad Request".to_string()),
    ]);
    let recorder = FakeRecorder::new(source.clone(), 0);
    let session = Arc::new(SessionRecorder::new(
        config.clone(),
        "someone",
        source.clone(),
        recorder.clone(),
        FakeToolkit::new(60.0),
    ));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move { session.run(cancel).await }
    });

    assert!(eventually(|| source.observations() >= 3).await);
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(source.remaining(), 0);
    assert!(recorder.recordings.lock().is_empty());
    assert!(config.recorded_dir("someone").is_dir());
    assert!(config.processed_dir("someone").is_dir());
}

#[tokio::test]
async fn test_leftover_recordings_are_processed_at_startup() {
    let storage = tempfile::tempdir().unwrap();
    let config = config(storage.path());
    let recorded = config.recorded_dir("someone");
    std::fs::create_dir_all(&recorded).unwrap();
    std::fs::write(recorded.join("someone-1.mp4"), b"video").unwrap();
    let mut timeline = Timeline::new().with_title("Earlier");
    timeline.push_category("Chess", 0.0);
    timeline.save(&recorded.join("someone-1.json")).unwrap();

    let source = FakeSource::new(Vec::new());
    let session = SessionRecorder::new(
        config.clone(),
        "someone",
        source.clone(),
        FakeRecorder::new(source.clone(), 0),
        FakeToolkit::new(60.0),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    session.run(cancel).await.unwrap();

    assert!(config.processed_dir("someone").join("someone-1.mp4").is_file());
    assert!(!recorded.join("someone-1.mp4").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_recording_without_video_discards_timeline() {
    let storage = tempfile::tempdir().unwrap();
    let config = config(storage.path());
    let source = FakeSource::new(vec![BroadcastState::Live(stream("Chess", "Openings"))]);
    let recorder = FakeRecorder::failing(source.clone());
    let session = Arc::new(SessionRecorder::new(
        config.clone(),
        "someone",
        source.clone(),
        recorder.clone(),
        FakeToolkit::new(60.0),
    ));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move { session.run(cancel).await }
    });

    // The loop observes again only after the failed session has been cleaned up.
    assert!(eventually(|| source.observations() >= 2).await);
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(recorder.recordings.lock().len(), 1);
    let recorded = config.recorded_dir("someone");
    assert!(files_with_extension(&recorded, "mp4").is_empty());
    assert!(files_with_extension(&recorded, "json").is_empty());
}
