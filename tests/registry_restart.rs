// tests/registry_restart.rs

use std::error::Error;
use std::path::{Path, PathBuf};

use watchsync::errors::SyncError;
use watchsync::fs::FileSystem;
use watchsync_test_utils::builders::{TestDaemonBuilder, SNAPSHOT_PATH};
use watchsync_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn listed(h: &watchsync_test_utils::TestDaemon) -> Vec<String> {
    h.daemon.list().iter().map(|wd| wd.to_string()).collect()
}

#[tokio::test]
async fn added_watch_survives_restart() -> TestResult {
    init_tracing();
    let first = TestDaemonBuilder::new().build();
    first.fs.add_dir("/data/app");
    first.daemon.watch(Path::new("/data/app"), "host1:backups/app").await?;

    let snapshot = first.fs.read_to_string(Path::new(SNAPSHOT_PATH))?;
    assert!(snapshot.contains(r#""/data/app/": "host1:backups/app/""#));

    let second = TestDaemonBuilder::new().fs(first.fs.clone()).build();
    assert!(second.daemon.list().is_empty());
    let summary = second.daemon.restore().await?;

    assert_eq!(summary.restored.len(), 1);
    assert!(summary.skipped.is_empty());
    assert_eq!(listed(&second), vec!["/data/app/ => host1:backups/app/".to_string()]);
    assert_eq!(second.source.watched(), vec![PathBuf::from("/data/app")]);
    Ok(())
}

#[tokio::test]
async fn removed_watch_stays_gone_after_restart() -> TestResult {
    init_tracing();
    let first = TestDaemonBuilder::new().build();
    first.fs.add_dir("/data/app");
    first.fs.add_dir("/data/web");
    first.daemon.watch(Path::new("/data/app"), "host1:backups/app").await?;
    first.daemon.watch(Path::new("/data/web"), "host2:www").await?;

    let removed = first.daemon.unwatch(Path::new("/data/app/"))?;
    assert_eq!(removed.remote.to_string(), "host1:backups/app/");
    assert_eq!(listed(&first), vec!["/data/web/ => host2:www/".to_string()]);
    assert_eq!(first.source.watched(), vec![PathBuf::from("/data/web")]);

    let second = TestDaemonBuilder::new().fs(first.fs.clone()).build();
    second.daemon.restore().await?;
    assert_eq!(listed(&second), vec!["/data/web/ => host2:www/".to_string()]);
    Ok(())
}

#[tokio::test]
async fn conflicting_adds_leave_registry_unchanged() -> TestResult {
    init_tracing();
    let h = TestDaemonBuilder::new().build();
    h.fs.add_dir("/data/app");
    h.fs.add_dir("/data/other");
    h.daemon.watch(Path::new("/data/app"), "host1:backups/app").await?;
    let before = h.fs.read_to_string(Path::new(SNAPSHOT_PATH))?;

    let same_local = h.daemon.watch(Path::new("/data/app"), "host9:elsewhere").await;
    assert!(matches!(same_local, Err(SyncError::AlreadyWatched { .. })));

    let same_remote = h.daemon.watch(Path::new("/data/other"), "host1:backups/app/").await;
    assert!(matches!(same_remote, Err(SyncError::AlreadyWatched { .. })));

    assert_eq!(listed(&h), vec!["/data/app/ => host1:backups/app/".to_string()]);
    assert_eq!(h.fs.read_to_string(Path::new(SNAPSHOT_PATH))?, before);
    assert_eq!(h.source.watched().len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_requests_are_validation_errors() -> TestResult {
    init_tracing();
    let h = TestDaemonBuilder::new().build();
    h.fs.add_file("/data/file.txt", "x");

    let cases = [
        ("relative/dir", "host1:x"),
        ("/data/missing", "host1:x"),
        ("/data/file.txt", "host1:x"),
        ("/data", "nohost"),
        ("/data", ":path"),
        ("/data", "host1:"),
    ];
    for (local, remote) in cases {
        match h.daemon.watch(Path::new(local), remote).await {
            Err(SyncError::Validation(_)) => {}
            other => panic!("{local} {remote}: expected validation error, got {other:?}"),
        }
    }
    assert!(h.daemon.list().is_empty());

    assert!(matches!(
        h.daemon.unwatch(Path::new("/data")),
        Err(SyncError::NotWatched(_))
    ));
    Ok(())
}

#[tokio::test]
async fn mirror_home_remote_uses_path_below_home() -> TestResult {
    init_tracing();
    let h = TestDaemonBuilder::new().build();
    h.fs.add_dir("/home/me/src/app");
    h.fs.add_dir("/srv/app");

    let wd = h.daemon.watch(Path::new("/home/me/src/app"), "host1:=").await?;
    assert_eq!(wd.remote.to_string(), "host1:src/app/");

    let outside = h.daemon.watch(Path::new("/srv/app"), "host1:=").await;
    assert!(matches!(outside, Err(SyncError::Validation(_))));
    Ok(())
}

#[tokio::test]
async fn first_run_writes_empty_snapshot() -> TestResult {
    init_tracing();
    let h = TestDaemonBuilder::new().build();
    assert!(!h.fs.exists(Path::new(SNAPSHOT_PATH)));

    let summary = h.daemon.restore().await?;

    assert!(summary.restored.is_empty());
    assert_eq!(h.fs.read_to_string(Path::new(SNAPSHOT_PATH))?.trim(), "{}");
    Ok(())
}

#[tokio::test]
async fn bad_snapshot_entries_are_skipped_and_pruned() -> TestResult {
    init_tracing();
    let h = TestDaemonBuilder::new().build();
    h.fs.add_dir("/data/app");
    h.fs.add_file(
        SNAPSHOT_PATH,
        r#"{
  "/data/app/": "host1:backups/app/",
  "/data/vanished/": "host1:backups/vanished/",
  "/data/app2/": "not-a-remote"
}"#,
    );

    let summary = h.daemon.restore().await?;

    assert_eq!(summary.restored.len(), 1);
    assert_eq!(summary.skipped.len(), 2);
    assert_eq!(listed(&h), vec!["/data/app/ => host1:backups/app/".to_string()]);

    let rewritten = h.fs.read_to_string(Path::new(SNAPSHOT_PATH))?;
    assert!(!rewritten.contains("vanished"));
    assert!(!rewritten.contains("not-a-remote"));
    Ok(())
}

#[tokio::test]
async fn corrupt_snapshot_is_an_error() -> TestResult {
    init_tracing();
    let h = TestDaemonBuilder::new().build();
    h.fs.add_file(SNAPSHOT_PATH, "{ this is not json");

    assert!(matches!(h.daemon.restore().await, Err(SyncError::JsonError(_))));
    assert!(h.daemon.list().is_empty());
    Ok(())
}
