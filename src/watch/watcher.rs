// src/watch/watcher.rs

use std::fmt;
use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::{EventKind, RawEvent};

/// A source of filesystem notifications that directories can be added to
/// and removed from while the daemon runs.
pub trait WatchSource: Send {
    fn watch(&mut self, dir: &Path) -> Result<()>;
    fn unwatch(&mut self, dir: &Path) -> Result<()>;
}

/// `notify`-backed watch source.
///
/// Dropping it stops all watches and closes the event stream.
pub struct NotifyWatchSource {
    inner: RecommendedWatcher,
}

impl fmt::Debug for NotifyWatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatchSource").finish()
    }
}

impl NotifyWatchSource {
    /// Create the watcher and the stream its events are forwarded to.
    ///
    /// The notify callback runs on notify's own thread; events are pushed
    /// into an unbounded tokio channel so the callback never blocks.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<RawEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<RawEvent>();

        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for raw in translate_event(&event) {
                        if event_tx.send(raw).is_err() {
                            // Receiver gone: the daemon is shutting down.
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            Config::default(),
        )?;

        Ok((Self { inner }, event_rx))
    }
}

impl WatchSource for NotifyWatchSource {
    fn watch(&mut self, dir: &Path) -> Result<()> {
        self.inner.watch(dir, RecursiveMode::NonRecursive)?;
        info!("watching {:?}", dir);
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> Result<()> {
        self.inner.unwatch(dir)?;
        info!("stopped watching {:?}", dir);
        Ok(())
    }
}

/// Map one notify event onto zero or more `RawEvent`s.
///
/// Renames are split into a removal of the old name and a creation of the
/// new one so both sides propagate to the remote.
pub fn translate_event(event: &Event) -> Vec<RawEvent> {
    let paths = &event.paths;
    let all = |kind: EventKind| -> Vec<RawEvent> {
        paths.iter().map(|p| RawEvent::new(p.clone(), kind)).collect()
    };

    let out = match event.kind {
        // Directories are never mirrored; only their files are.
        NotifyKind::Create(CreateKind::Folder) | NotifyKind::Remove(RemoveKind::Folder) => {
            all(EventKind::Other)
        }
        NotifyKind::Create(_) => all(EventKind::Created),
        NotifyKind::Remove(_) => all(EventKind::Removed),
        NotifyKind::Modify(ModifyKind::Data(_)) | NotifyKind::Modify(ModifyKind::Any) => {
            all(EventKind::Modified)
        }
        NotifyKind::Modify(ModifyKind::Name(RenameMode::From)) => all(EventKind::Removed),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::To)) => all(EventKind::Created),
        NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => vec![
            RawEvent::new(paths[0].clone(), EventKind::Removed),
            RawEvent::new(paths[1].clone(), EventKind::Created),
        ],
        _ => all(EventKind::Other),
    };

    debug!(?event, translated = out.len(), "translated notify event");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, MetadataKind};
    use std::path::PathBuf;

    fn ev(kind: NotifyKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    #[test]
    fn content_events_map_to_interesting_kinds() {
        let created = translate_event(&ev(NotifyKind::Create(CreateKind::File), &["/d/a"]));
        assert_eq!(created, vec![RawEvent::new("/d/a", EventKind::Created)]);

        let written = translate_event(&ev(
            NotifyKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/d/a"],
        ));
        assert_eq!(written, vec![RawEvent::new("/d/a", EventKind::Modified)]);

        let removed = translate_event(&ev(NotifyKind::Remove(RemoveKind::File), &["/d/a"]));
        assert_eq!(removed, vec![RawEvent::new("/d/a", EventKind::Removed)]);
    }

    #[test]
    fn metadata_changes_are_other() {
        let out = translate_event(&ev(
            NotifyKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/d/a"],
        ));
        assert_eq!(out, vec![RawEvent::new("/d/a", EventKind::Other)]);
    }

    #[test]
    fn rename_both_becomes_remove_and_create() {
        let out = translate_event(&ev(
            NotifyKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/d/old", "/d/new"],
        ));
        assert_eq!(
            out,
            vec![
                RawEvent::new("/d/old", EventKind::Removed),
                RawEvent::new("/d/new", EventKind::Created),
            ]
        );
    }

    #[test]
    fn folder_create_and_remove_are_other() {
        let removed = translate_event(&ev(NotifyKind::Remove(RemoveKind::Folder), &["/d/sub"]));
        assert_eq!(removed, vec![RawEvent::new("/d/sub", EventKind::Other)]);

        let created = translate_event(&ev(NotifyKind::Create(CreateKind::Folder), &["/d/sub"]));
        assert_eq!(created, vec![RawEvent::new("/d/sub", EventKind::Other)]);
    }
}
