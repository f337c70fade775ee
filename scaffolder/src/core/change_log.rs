//! Append-only history of staged file contents.
//!
//! Every staged write of a path appends one [`Change`]; nothing is ever
//! removed or rewritten, so any two versions of a file can be diffed later.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::diff::{DiffLine, diff_lines};

/// One historical snapshot of a staged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub timestamp: DateTime<Utc>,
    /// Provenance label of the writer, if any.
    pub origin: Option<String>,
    pub contents: String,
}

/// Ordered history for a single path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileChanges {
    path: String,
    log: Vec<Change>,
}

impl FileChanges {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            log: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn add(&mut self, contents: impl Into<String>, origin: Option<String>) {
        self.log.push(Change {
            timestamp: Utc::now(),
            origin,
            contents: contents.into(),
        });
    }

    /// Record at `index`; negative indices count from the end (`-1` is the latest).
    pub fn at(&self, index: isize) -> Option<&Change> {
        resolve_index(index, self.log.len()).map(|idx| &self.log[idx])
    }

    /// Alias of [`FileChanges::at`].
    pub fn get(&self, index: isize) -> Option<&Change> {
        self.at(index)
    }

    /// Line diff between the records at `prev` and `next`.
    ///
    /// Returns `None` when either index is out of range.
    pub fn diff(&self, prev: isize, next: isize) -> Option<Vec<DiffLine>> {
        let before = self.at(prev)?;
        let after = self.at(next)?;
        Some(diff_lines(&before.contents, &after.contents))
    }

    pub fn records(&self) -> &[Change] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// Histories for every path written during a run.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    files: HashMap<String, FileChanges>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, contents: impl Into<String>, origin: Option<String>) {
        self.files
            .entry(path.to_string())
            .or_insert_with(|| FileChanges::new(path))
            .add(contents, origin);
    }

    pub fn get(&self, path: &str) -> Option<&FileChanges> {
        self.files.get(path)
    }

    pub fn at(&self, path: &str, index: isize) -> Option<&Change> {
        self.files.get(path)?.at(index)
    }

    pub fn diff(&self, path: &str, prev: isize, next: isize) -> Option<Vec<DiffLine>> {
        self.files.get(path)?.diff(prev, next)
    }
}

fn resolve_index(index: isize, len: usize) -> Option<usize> {
    if index >= 0 {
        let idx = index as usize;
        return (idx < len).then_some(idx);
    }
    len.checked_sub(index.unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diff::DiffTag;

    #[test]
    fn history_is_append_only_and_ordered() {
        let mut log = ChangeLog::new();
        log.add("README.md", "v1", Some("init".to_string()));
        log.add("README.md", "v2", Some("readme".to_string()));

        let changes = log.get("README.md").expect("history");
        let contents: Vec<&str> = changes
            .records()
            .iter()
            .map(|change| change.contents.as_str())
            .collect();
        assert_eq!(contents, vec!["v1", "v2"]);
        assert_eq!(changes.at(0).and_then(|c| c.origin.as_deref()), Some("init"));
        assert!(changes.at(0).expect("first").timestamp <= changes.at(1).expect("second").timestamp);
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let mut changes = FileChanges::new("a.txt");
        changes.add("one", None);
        changes.add("two", None);
        changes.add("three", None);

        assert_eq!(changes.at(-1).map(|c| c.contents.as_str()), Some("three"));
        assert_eq!(changes.get(-3).map(|c| c.contents.as_str()), Some("one"));
        assert!(changes.at(-4).is_none());
        assert!(changes.at(3).is_none());
    }

    #[test]
    fn identical_writes_still_append() {
        let mut log = ChangeLog::new();
        log.add("same.txt", "x", None);
        log.add("same.txt", "x", None);
        assert_eq!(log.get("same.txt").map(FileChanges::len), Some(2));
    }

    #[test]
    fn diff_between_recorded_snapshots() {
        let mut log = ChangeLog::new();
        log.add("f", "a\nb\nc", None);
        log.add("f", "a\nx\nc", None);

        let lines = log.diff("f", 0, 1).expect("diff");
        let removed: Vec<&str> = lines
            .iter()
            .filter(|entry| entry.tag == DiffTag::Removed)
            .map(|entry| entry.line.as_str())
            .collect();
        assert_eq!(removed, vec!["b"]);
        assert!(log.diff("f", 0, 2).is_none());
        assert!(log.diff("missing", 0, 1).is_none());
    }
}
