#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use watchsync::config::{ConfigFile, RawConfigFile};
use watchsync::engine::{Daemon, Runtime};
use watchsync::exec::DispatchPool;
use watchsync::fs::mock::MockFileSystem;
use watchsync::fs::FileSystem;
use watchsync::registry::SnapshotStore;
use watchsync::types::RawEvent;
use watchsync::watch::{EventCollector, IgnorePolicy};

use crate::fake_transfer::FakeTransfer;
use crate::fake_watch::FakeWatchSource;

/// Default snapshot location inside the mock filesystem.
pub const SNAPSHOT_PATH: &str = "/state/watched.json";

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn parallel(mut self, n: usize) -> Self {
        self.config.daemon.parallel = n;
        self
    }

    pub fn delay(mut self, d: &str) -> Self {
        self.config.daemon.delay = d.to_string();
        self
    }

    pub fn quiet(mut self, d: &str) -> Self {
        self.config.daemon.quiet = d.to_string();
        self
    }

    pub fn guess_text(mut self, val: bool) -> Self {
        self.config.daemon.guess_text = val;
        self
    }

    pub fn ignore_pattern(mut self, pattern: &str) -> Self {
        self.config.ignore.patterns.push(pattern.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A daemon wired to in-memory fakes, plus handles to inspect them.
pub struct TestDaemon {
    pub daemon: Daemon,
    pub runtime: Runtime,
    pub fs: MockFileSystem,
    pub transfer: Arc<FakeTransfer>,
    pub source: FakeWatchSource,
    /// Feeds the runtime's collector.
    pub events: mpsc::UnboundedSender<RawEvent>,
}

/// Builder for [`TestDaemon`].
pub struct TestDaemonBuilder {
    config: ConfigFile,
    fs: MockFileSystem,
    transfer: Arc<FakeTransfer>,
    snapshot: PathBuf,
    home: Option<PathBuf>,
}

impl TestDaemonBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigFileBuilder::new().delay("200ms").quiet("50ms").build(),
            fs: MockFileSystem::new(),
            transfer: Arc::new(FakeTransfer::new()),
            snapshot: PathBuf::from(SNAPSHOT_PATH),
            home: Some(PathBuf::from("/home/me")),
        }
    }

    pub fn config(mut self, config: ConfigFile) -> Self {
        self.config = config;
        self
    }

    /// Share a filesystem, e.g. to simulate a restart.
    pub fn fs(mut self, fs: MockFileSystem) -> Self {
        self.fs = fs;
        self
    }

    pub fn transfer(mut self, transfer: Arc<FakeTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn snapshot(mut self, path: impl AsRef<Path>) -> Self {
        self.snapshot = path.as_ref().to_path_buf();
        self
    }

    pub fn build(self) -> TestDaemon {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let policy = Arc::new(
            IgnorePolicy::from_config(&self.config, Arc::clone(&fs))
                .expect("Failed to build ignore policy"),
        );
        let source = FakeWatchSource::new();
        let snapshot = SnapshotStore::new(self.snapshot, Arc::clone(&fs));

        let daemon = Daemon::new(
            Box::new(source.clone()),
            self.transfer.clone(),
            fs,
            policy,
            snapshot,
        )
        .with_home(self.home);

        let (events, rx) = mpsc::unbounded_channel();
        let collector = EventCollector::new(rx, self.config.daemon.delay, self.config.daemon.quiet);
        let pool = DispatchPool::new(self.config.daemon.parallel, self.transfer.clone());
        let runtime = Runtime::new(daemon.clone(), collector, pool, self.config.daemon.delay);

        TestDaemon {
            daemon,
            runtime,
            fs: self.fs,
            transfer: self.transfer,
            source,
            events,
        }
    }
}

impl Default for TestDaemonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `cond` every 10ms until it holds or `within` elapses.
pub async fn wait_until(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
