mod common;

use std::path::Path;
use std::sync::Arc;

use common::FakeToolkit;
use timeline::Timeline;
use tokio::sync::Mutex;
use twitch_recorder::VodProcessor;

struct Dirs {
    _root: tempfile::TempDir,
    recorded: std::path::PathBuf,
    processed: std::path::PathBuf,
}

fn dirs() -> Dirs {
    let root = tempfile::tempdir().unwrap();
    let recorded = root.path().join("recorded");
    let processed = root.path().join("processed");
    std::fs::create_dir_all(&recorded).unwrap();
    std::fs::create_dir_all(&processed).unwrap();
    Dirs {
        _root: root,
        recorded,
        processed,
    }
}

fn write_session(dir: &Path, name: &str, timeline: Option<&Timeline>) {
    std::fs::write(dir.join(format!("{name}.mp4")), b"video").unwrap();
    if let Some(timeline) = timeline {
        timeline.save(&dir.join(format!("{name}.json"))).unwrap();
    }
}

fn session_timeline() -> Timeline {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();
    let mut timeline = Timeline::new()
        .with_id("123")
        .with_title("Speedruns")
        .with_author("SomeOne");
    timeline.push_category("Just Chatting", now - 50.0);
    timeline.push_category("Super Mario 64", now - 20.0);
    timeline.push_title("Speedruns", now - 50.0);
    timeline
}

fn processor(toolkit: Arc<FakeToolkit>, dirs: &Dirs) -> (VodProcessor, Arc<Mutex<()>>) {
    let lock = Arc::new(Mutex::new(()));
    let processor = VodProcessor::new(toolkit, &dirs.recorded, &dirs.processed, Arc::clone(&lock));
    (processor, lock)
}

#[tokio::test]
async fn test_process_finalizes_and_removes_sources() {
    let dirs = dirs();
    write_session(&dirs.recorded, "someone-1", Some(&session_timeline()));
    let toolkit = FakeToolkit::new(100.0);
    let (processor, _lock) = processor(toolkit.clone(), &dirs);

    let output = processor
        .process(&dirs.recorded.join("someone-1.mp4"))
        .await
        .unwrap();

    assert_eq!(output, dirs.processed.join("someone-1.mp4"));
    assert!(output.is_file());
    assert!(!dirs.recorded.join("someone-1.mp4").exists());
    assert!(!dirs.recorded.join("someone-1.json").exists());
    assert!(!dirs.processed.join("someone-1.ffmetadata").exists());

    let finalized = Timeline::load(&dirs.processed.join("someone-1.json")).unwrap();
    let (start, end) = finalized.window().unwrap();
    assert!((end - start - 100.0).abs() < 1e-6);

    let merged = toolkit.merged_metadata.lock().clone();
    assert_eq!(merged.len(), 1);
    let metadata = &merged[0];
    assert!(metadata.starts_with(";FFMETADATA1\nencoder=Lavf\n"));
    assert!(metadata.contains("title=Speedruns\n"));
    assert!(metadata.contains("author=SomeOne\n"));
    assert!(metadata.contains("Categories:"));
    assert_eq!(metadata.matches("[CHAPTER]").count(), 2);
    assert!(metadata.contains("title=Just Chatting\n"));
    assert!(metadata.contains("title=Super Mario 64\n"));
}

#[tokio::test]
async fn test_merge_failure_keeps_sources() {
    let dirs = dirs();
    write_session(&dirs.recorded, "someone-1", Some(&session_timeline()));
    let (processor, _lock) = processor(FakeToolkit::failing_merge(100.0), &dirs);

    assert!(
        processor
            .process(&dirs.recorded.join("someone-1.mp4"))
            .await
            .is_err()
    );

    assert!(dirs.recorded.join("someone-1.mp4").is_file());
    assert!(dirs.recorded.join("someone-1.json").is_file());
    assert!(!dirs.processed.join("someone-1.mp4").exists());
    assert!(!dirs.processed.join("someone-1.json").exists());
}

#[tokio::test]
async fn test_corrupt_timeline_keeps_sources() {
    let dirs = dirs();
    write_session(&dirs.recorded, "someone-1", None);
    std::fs::write(dirs.recorded.join("someone-1.json"), b"{\"categories\": [").unwrap();
    let (processor, _lock) = processor(FakeToolkit::new(100.0), &dirs);

    assert!(
        processor
            .process(&dirs.recorded.join("someone-1.mp4"))
            .await
            .is_err()
    );
    assert!(dirs.recorded.join("someone-1.mp4").is_file());
    assert!(dirs.recorded.join("someone-1.json").is_file());
}

#[tokio::test]
async fn test_process_all_skips_failures() {
    let dirs = dirs();
    write_session(&dirs.recorded, "someone-1", Some(&session_timeline()));
    write_session(&dirs.recorded, "someone-2", None);
    let (processor, _lock) = processor(FakeToolkit::new(100.0), &dirs);

    assert_eq!(processor.process_all().await, 1);
    assert!(dirs.processed.join("someone-1.mp4").is_file());
    assert!(dirs.recorded.join("someone-2.mp4").is_file());
}

#[tokio::test]
async fn test_process_all_waits_for_recording_to_finish() {
    let dirs = dirs();
    write_session(&dirs.recorded, "someone-1", Some(&session_timeline()));
    let (processor, lock) = processor(FakeToolkit::new(100.0), &dirs);

    let recording = lock.lock().await;
    assert_eq!(processor.process_all().await, 0);
    assert!(dirs.recorded.join("someone-1.mp4").is_file());

    drop(recording);
    assert_eq!(processor.process_all().await, 1);
}

#[tokio::test]
async fn test_reprocessing_replaces_stale_output() {
    let dirs = dirs();
    write_session(&dirs.recorded, "someone-1", Some(&session_timeline()));
    std::fs::write(dirs.processed.join("someone-1.mp4"), b"stale").unwrap();
    std::fs::write(dirs.processed.join("someone-1.ffmetadata"), b"stale").unwrap();
    let toolkit = FakeToolkit::new(100.0);
    let (processor, _lock) = processor(toolkit.clone(), &dirs);

    processor
        .process(&dirs.recorded.join("someone-1.mp4"))
        .await
        .unwrap();

    assert_eq!(std::fs::read(dirs.processed.join("someone-1.mp4")).unwrap(), b"video");
    assert!(!toolkit.merged_metadata.lock()[0].contains("stale"));
}
