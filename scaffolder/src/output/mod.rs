//! Virtual output collection: staged files, their history, and the disk flush.
//!
//! Nothing reaches the filesystem until [`OutputCollection::write_files_to_disk`]
//! runs. Every handle created through [`OutputCollection::with_origin`] shares
//! the same root state; handles differ only in the origin tag they attach to
//! writes.

pub mod events;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::change_log::{ChangeLog, FileChanges};
use crate::core::diff::DiffLine;
use crate::io::config::RunOptions;
use crate::io::output_file::{resolve_output_path, write_output_file};

pub use events::{Listener, OutputEvent, OutputEventKind, SubscriptionId};
use events::EventBus;

/// Flush settings fixed when the collection is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Base for resolving a relative `out_dir`.
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
    pub dry_run: bool,
    /// Record every staged write in the change log.
    pub log_changes: bool,
}

impl OutputSettings {
    pub fn from_options(cwd: &Path, options: &RunOptions) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            out_dir: options.out_dir.clone(),
            dry_run: options.dry_run,
            log_changes: options.tracks_changes(),
        }
    }
}

/// Per-flush overrides of [`OutputSettings`].
#[derive(Debug, Clone, Default)]
pub struct FlushOverrides {
    pub out_dir: Option<PathBuf>,
    pub dry_run: Option<bool>,
}

/// A file that could not be persisted during a flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Summary of one flush, in staging order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub dry_run: bool,
    pub written: Vec<PathBuf>,
    pub failed: Vec<FlushFailure>,
}

impl FlushReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

struct Shared {
    settings: OutputSettings,
    files: IndexMap<String, String>,
    change_log: ChangeLog,
    bus: EventBus,
}

/// Handle to a run's staged file set.
///
/// Cloning is cheap and yields a handle onto the same files.
#[derive(Clone)]
pub struct OutputCollection {
    root: Arc<Mutex<Shared>>,
    origin: Option<String>,
}

impl OutputCollection {
    pub fn new(settings: OutputSettings) -> Self {
        Self {
            root: Arc::new(Mutex::new(Shared {
                settings,
                files: IndexMap::new(),
                change_log: ChangeLog::new(),
                bus: EventBus::default(),
            })),
            origin: None,
        }
    }

    /// A view onto the same files that tags its writes with `name`.
    pub fn with_origin(&self, name: impl Into<String>) -> Self {
        Self {
            root: Arc::clone(&self.root),
            origin: Some(name.into()),
        }
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn settings(&self) -> OutputSettings {
        self.root.lock().settings.clone()
    }

    /// True when both handles view the same underlying file set.
    pub fn shares_root_with(&self, other: &OutputCollection) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// Stage `contents` for `path`, attributed to this view's origin.
    pub fn write(&self, path: impl Into<String>, contents: impl Into<String>) {
        self.write_with_origin(path, contents, self.origin.clone());
    }

    /// Stage `contents` for `path` with an explicit origin.
    ///
    /// Replaces any previously staged contents. With change tracking enabled
    /// the write is also appended to the path's history, even when the
    /// contents are unchanged.
    pub fn write_with_origin(
        &self,
        path: impl Into<String>,
        contents: impl Into<String>,
        origin: Option<String>,
    ) {
        let path = path.into();
        let contents = contents.into();
        {
            let mut shared = self.root.lock();
            shared.files.insert(path.clone(), contents.clone());
            if shared.settings.log_changes {
                shared.change_log.add(&path, contents.clone(), origin.clone());
            }
        }
        debug!(path = %path, origin = ?origin, bytes = contents.len(), "file staged");
        self.emit(&OutputEvent::FileStacked {
            path,
            origin,
            contents,
        });
    }

    /// The staged `(path, contents)` pair for `path`.
    pub fn get(&self, path: &str) -> Option<(String, String)> {
        let shared = self.root.lock();
        shared
            .files
            .get(path)
            .map(|contents| (path.to_string(), contents.clone()))
    }

    /// The first staged pair, in staging order, for which `predicate` holds.
    ///
    /// The predicate runs on a snapshot taken before it is called, so it may
    /// read the collection.
    pub fn find<F>(&self, predicate: F) -> Option<(String, String)>
    where
        F: Fn(&str, &str) -> bool,
    {
        self.staged_pairs()
            .into_iter()
            .find(|(path, contents)| predicate(path, contents))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.root.lock().files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.root.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.lock().files.is_empty()
    }

    /// Staged paths in staging order.
    pub fn paths(&self) -> Vec<String> {
        self.root.lock().files.keys().cloned().collect()
    }

    /// Ordered copy of the staged file set.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.root.lock().files.clone()
    }

    pub fn tracks_changes(&self) -> bool {
        self.root.lock().settings.log_changes
    }

    /// History of `path`, or `None` when change tracking is disabled or
    /// the path was never staged.
    pub fn get_changes(&self, path: &str) -> Option<FileChanges> {
        let shared = self.root.lock();
        if !shared.settings.log_changes {
            return None;
        }
        shared.change_log.get(path).cloned()
    }

    /// Line diff between two recorded versions of `path`.
    pub fn diff(&self, path: &str, prev: isize, next: isize) -> Option<Vec<DiffLine>> {
        let shared = self.root.lock();
        if !shared.settings.log_changes {
            return None;
        }
        shared.change_log.diff(path, prev, next)
    }

    /// Subscribe `listener` to one event kind.
    pub fn on<F>(&self, kind: OutputEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&OutputEvent) + Send + Sync + 'static,
    {
        self.root.lock().bus.subscribe(Some(kind), Arc::new(listener), false)
    }

    /// Subscribe `listener` to the next event of one kind only.
    pub fn once<F>(&self, kind: OutputEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&OutputEvent) + Send + Sync + 'static,
    {
        self.root.lock().bus.subscribe(Some(kind), Arc::new(listener), true)
    }

    /// Subscribe `listener` to every event kind.
    pub fn on_any<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&OutputEvent) + Send + Sync + 'static,
    {
        self.root.lock().bus.subscribe(None, Arc::new(listener), false)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.root.lock().bus.unsubscribe(id)
    }

    /// Flush with the settings the collection was created with.
    pub fn flush(&self) -> FlushReport {
        self.write_files_to_disk(&FlushOverrides::default())
    }

    /// Persist every staged file, in staging order.
    ///
    /// Per-file failures are reported through [`OutputEvent::FileError`] and
    /// the returned report; they never stop the remaining files. In a dry run
    /// every step except the physical write is performed.
    #[instrument(skip_all)]
    pub fn write_files_to_disk(&self, overrides: &FlushOverrides) -> FlushReport {
        let staged = self.staged_pairs();
        let settings = self.settings();
        let out_dir = overrides.out_dir.clone().unwrap_or(settings.out_dir);
        let dry_run = overrides.dry_run.unwrap_or(settings.dry_run);
        let total = staged.len();
        debug!(total, dry_run, out_dir = %out_dir.display(), "flushing staged files");

        let mut report = FlushReport {
            dry_run,
            ..FlushReport::default()
        };
        self.emit(&OutputEvent::WriteStart { index: 1, total });

        for (position, (path, contents)) in staged.into_iter().enumerate() {
            let index = position + 1;
            let target = resolve_output_path(&settings.cwd, &out_dir, &path);
            let result = if dry_run {
                Ok(())
            } else {
                write_output_file(&target, &contents)
            };
            match result {
                Ok(()) => {
                    report.written.push(target.clone());
                    self.emit(&OutputEvent::FileWritten {
                        path: target,
                        index,
                        total,
                    });
                }
                Err(err) => {
                    warn!(path = %target.display(), error = %format!("{err:#}"), "file write failed");
                    report.failed.push(FlushFailure {
                        path: target.clone(),
                        error: format!("{err:#}"),
                    });
                    self.emit(&OutputEvent::FileError {
                        path: target,
                        index,
                        total,
                        error: Arc::new(err),
                    });
                }
            }
        }

        self.emit(&OutputEvent::WriteDone {
            index: report.total(),
            total,
        });
        report
    }

    fn staged_pairs(&self) -> Vec<(String, String)> {
        self.root
            .lock()
            .files
            .iter()
            .map(|(path, contents)| (path.clone(), contents.clone()))
            .collect()
    }

    fn emit(&self, event: &OutputEvent) {
        let listeners = self.root.lock().bus.take_listeners(event.kind());
        for listener in listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for OutputCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputCollection")
            .field("origin", &self.origin)
            .field("files", &self.len())
            .finish()
    }
}
