use std::fmt;
use std::path::PathBuf;

/// Kind of a raw filesystem change notification.
///
/// Only `Created`, `Modified` and `Removed` are interesting to the daemon;
/// everything else (metadata changes, access events, ...) maps to `Other`
/// and is dropped by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Modified,
    Removed,
    Other,
}

impl EventKind {
    pub fn is_interesting(self) -> bool {
        !matches!(self, EventKind::Other)
    }

    pub fn is_remove(self) -> bool {
        matches!(self, EventKind::Removed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Created => "created",
            EventKind::Modified => "modified",
            EventKind::Removed => "removed",
            EventKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A single `(path, kind)` notification from the watch source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Events collected within one debounce window, in arrival order.
pub type Batch = Vec<RawEvent>;
