//! Integration tests for the drain engine against real subprocesses.
//!
//! The fetch command is a small `sh` script standing in for yt-dlp.

#![cfg(unix)]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use nasutil_core::{
    ConfirmPolicy, DrainEngine, DrainReport, FetchCommand, FetchError, FetchObserver,
    NoopObserver, Progress, QueueConfig, QueueStore,
};
use tempfile::TempDir;

fn script_command(script: &str) -> FetchCommand {
    FetchCommand::new("sh", ["-c", script, "sh", "{url}"])
}

fn setup(confirm: ConfirmPolicy) -> (QueueConfig, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = QueueConfig::new(
        temp_dir.path().join("to-download.txt"),
        temp_dir.path().join("media"),
    )
    .with_fetch_timeout(Duration::from_secs(30))
    .with_idle_timeout(Duration::from_secs(10))
    .with_confirm(confirm);
    (config, temp_dir)
}

#[derive(Default)]
struct RecordingObserver {
    destinations: Mutex<Vec<String>>,
    progress: Mutex<Vec<f32>>,
}

impl FetchObserver for RecordingObserver {
    fn on_destination(&self, _url: &str, path: &Path) {
        self.destinations
            .lock()
            .expect("lock")
            .push(path.display().to_string());
    }

    fn on_progress(&self, _url: &str, progress: &Progress) {
        self.progress.lock().expect("lock").push(progress.percent);
    }
}

#[tokio::test]
async fn test_destination_line_empties_single_url_queue() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://example.com/watch?v=abc").expect("insert");
    let engine = DrainEngine::from_config(
        &config,
        script_command("echo '[download] Destination: foo.mp4'"),
    );

    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    match report {
        DrainReport::Consumed {
            url, destination, ..
        } => {
            assert_eq!(url, "https://example.com/watch?v=abc");
            assert_eq!(destination.as_deref(), Some(Path::new("foo.mp4")));
        }
        other => panic!("unexpected report: {other:?}"),
    }
    assert!(store.is_empty().expect("is_empty"));
}

#[tokio::test]
async fn test_failing_command_without_destination_keeps_url() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/y").expect("insert");
    let engine = DrainEngine::from_config(&config, script_command("echo 'ERROR: nope'; exit 1"));

    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    assert!(matches!(
        report,
        DrainReport::Kept {
            error: FetchError::NoDestination {
                exit_code: Some(1),
                ..
            },
            ..
        }
    ));
    assert_eq!(store.list().expect("list"), vec!["https://x/y"]);
}

#[tokio::test]
async fn test_empty_queue_spawns_nothing() {
    let (config, temp_dir) = setup(ConfirmPolicy::Completed);
    let marker = temp_dir.path().join("spawned");
    let engine = DrainEngine::from_config(
        &config,
        script_command(&format!("touch '{}'", marker.display())),
    );

    let report = engine.drain_once(&NoopObserver).await.expect("drain");
    let summary = engine.drain_all(&NoopObserver).await.expect("drain");

    assert!(report.is_idle());
    assert!(summary.is_idle());
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_command_receives_url_and_runs_in_output_dir() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/clip").expect("insert");
    let engine = DrainEngine::from_config(
        &config,
        script_command(r#"echo "$1" > url.txt; echo '[download] Destination: clip.mp4'"#),
    );

    engine.drain_once(&NoopObserver).await.expect("drain");

    let written = std::fs::read_to_string(config.output_dir.join("url.txt")).expect("read");
    assert_eq!(written.trim(), "https://x/clip");
}

#[tokio::test]
async fn test_completed_policy_keeps_url_when_exit_fails_after_destination() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/y").expect("insert");
    let engine = DrainEngine::from_config(
        &config,
        script_command("echo '[download] Destination: y.mp4'; exit 2"),
    );

    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    assert!(matches!(
        report,
        DrainReport::Kept {
            error: FetchError::ExitFailure {
                exit_code: Some(2),
                ..
            },
            ..
        }
    ));
    assert_eq!(store.len().expect("len"), 1);
}

#[tokio::test]
async fn test_started_policy_removes_url_even_if_exit_fails() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Started);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/y").expect("insert");
    let engine = DrainEngine::from_config(
        &config,
        script_command("echo '[download] Destination: y.mp4'; exit 2"),
    );

    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    assert!(matches!(
        report,
        DrainReport::Consumed {
            late_failure: Some(_),
            ..
        }
    ));
    assert!(!report.is_failure());
    assert!(store.is_empty().expect("is_empty"));
}

#[tokio::test]
async fn test_progress_and_destination_reach_observer() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/y").expect("insert");
    let script = concat!(
        "echo '[download] Destination: y.f137.mp4'; ",
        r"printf '[download]  10.0%% of 5.00MiB at 1.00MiB/s ETA 00:04\r",
        r"[download]  55.5%% of 5.00MiB at 1.00MiB/s ETA 00:02\r",
        r"[download] 100%% of 5.00MiB\n'; ",
        r#"echo '[Merger] Merging formats into "y.mp4"'"#,
    );
    let engine = DrainEngine::from_config(&config, script_command(script));
    let observer = RecordingObserver::default();

    let report = engine.drain_once(&observer).await.expect("drain");

    assert!(matches!(
        report,
        DrainReport::Consumed { ref destination, .. }
            if destination.as_deref() == Some(Path::new("y.mp4"))
    ));
    assert_eq!(
        *observer.destinations.lock().expect("lock"),
        vec!["y.f137.mp4".to_string()]
    );
    assert_eq!(
        *observer.progress.lock().expect("lock"),
        vec![10.0_f32, 55.5, 100.0]
    );
}

#[tokio::test]
async fn test_drain_all_isolates_failing_url() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    for url in ["https://x/a", "https://x/broken", "https://x/c"] {
        store.insert(url).expect("insert");
    }
    let script = concat!(
        r#"case "$1" in *broken*) exit 1;; "#,
        r#"*) echo "[download] Destination: ${1##*/}.mp4";; esac"#,
    );
    let engine = DrainEngine::from_config(&config, script_command(script));

    let summary = engine.drain_all(&NoopObserver).await.expect("drain");

    assert_eq!(summary.consumed(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(store.list().expect("list"), vec!["https://x/broken"]);
}

#[tokio::test]
async fn test_silent_command_hits_idle_timeout_and_keeps_url() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let config = config.with_idle_timeout(Duration::from_millis(200));
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/slow").expect("insert");
    let engine = DrainEngine::from_config(&config, script_command("sleep 5"));

    let started = std::time::Instant::now();
    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(matches!(
        report,
        DrainReport::Kept {
            error: FetchError::TimedOut { kind: "idle", .. },
            ..
        }
    ));
    assert_eq!(store.len().expect("len"), 1);
}

#[tokio::test]
async fn test_chatty_command_hits_overall_timeout_and_keeps_url() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let config = config.with_fetch_timeout(Duration::from_millis(300));
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/endless").expect("insert");
    let engine = DrainEngine::from_config(
        &config,
        script_command("while :; do echo tick; sleep 0.05; done"),
    );

    let started = std::time::Instant::now();
    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        report,
        DrainReport::Kept {
            error: FetchError::TimedOut {
                kind: "overall",
                ..
            },
            ..
        }
    ));
    assert_eq!(store.list().expect("list"), vec!["https://x/endless"]);
}

#[tokio::test]
async fn test_url_removed_during_fetch_does_not_abort_drain() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/a").expect("insert");
    store.insert("https://x/b").expect("insert");
    let queue = config.queue_file.display().to_string();
    let script = format!(
        concat!(
            r#"if [ "$1" = https://x/a ]; then "#,
            r#"grep -vx "$1" '{queue}' > '{queue}.tmp'; mv '{queue}.tmp' '{queue}'; fi; "#,
            "echo '[download] Destination: f.mp4'",
        ),
        queue = queue
    );
    let engine = DrainEngine::from_config(&config, script_command(&script));

    let summary = engine.drain_all(&NoopObserver).await.expect("drain");

    assert_eq!(summary.consumed(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(matches!(
        &summary.reports()[0],
        DrainReport::Vanished { url, .. } if url == "https://x/a"
    ));
    assert!(store.is_empty().expect("is_empty"));
}

#[tokio::test]
async fn test_missing_program_is_reported_as_spawn_failure() {
    let (config, _temp_dir) = setup(ConfirmPolicy::Completed);
    let store = QueueStore::new(&config.queue_file);
    store.insert("https://x/y").expect("insert");
    let engine = DrainEngine::from_config(
        &config,
        FetchCommand::yt_dlp().with_program("/nonexistent/nasutil-fetch"),
    );

    let report = engine.drain_once(&NoopObserver).await.expect("drain");

    assert!(matches!(
        report,
        DrainReport::Kept {
            error: FetchError::Spawn { .. },
            ..
        }
    ));
    assert_eq!(store.len().expect("len"), 1);
}
