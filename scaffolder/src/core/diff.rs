//! Line-level diff between two content snapshots.
//!
//! The edit script comes from Myers' algorithm over lines. It is a
//! reporting aid only: there is no patch-apply counterpart.

use std::time::{Duration, Instant};

use serde::Serialize;
use similar::{Algorithm, DiffOp, capture_diff_slices_deadline};

/// Upper bound on diff search time. Past it the edit script is still
/// correct but may no longer be minimal.
const DIFF_DEADLINE: Duration = Duration::from_millis(500);

/// Classification of a single line in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffTag {
    /// Present in both snapshots.
    Context,
    /// Present only in the previous snapshot.
    Removed,
    /// Present only in the next snapshot.
    Added,
}

/// One tagged line of a flattened diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    pub tag: DiffTag,
    pub line: String,
}

impl DiffLine {
    fn new(tag: DiffTag, line: &str) -> Self {
        Self {
            tag,
            line: line.to_string(),
        }
    }
}

/// Compute a flat, document-ordered line diff from `prev` to `next`.
///
/// Both inputs are split on `\n` (a trailing newline yields a final empty
/// line). Within every changed block, removed lines precede added lines.
pub fn diff_lines(prev: &str, next: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = prev.split('\n').collect();
    let new: Vec<&str> = next.split('\n').collect();
    let ops = capture_diff_slices_deadline(
        Algorithm::Myers,
        &old,
        &new,
        Some(Instant::now() + DIFF_DEADLINE),
    );

    let mut out = Vec::with_capacity(old.len().max(new.len()));
    let mut removed = Vec::new();
    let mut added = Vec::new();

    for op in ops {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                flush_block(&mut out, &mut removed, &mut added);
                out.extend(
                    old[old_index..old_index + len]
                        .iter()
                        .map(|line| DiffLine::new(DiffTag::Context, line)),
                );
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => removed.extend(tagged(&old, old_index, old_len, DiffTag::Removed)),
            DiffOp::Insert {
                new_index, new_len, ..
            } => added.extend(tagged(&new, new_index, new_len, DiffTag::Added)),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                removed.extend(tagged(&old, old_index, old_len, DiffTag::Removed));
                added.extend(tagged(&new, new_index, new_len, DiffTag::Added));
            }
        }
    }
    flush_block(&mut out, &mut removed, &mut added);

    out
}

fn tagged<'a>(
    source: &'a [&str],
    start: usize,
    len: usize,
    tag: DiffTag,
) -> impl Iterator<Item = DiffLine> + 'a {
    source[start..start + len]
        .iter()
        .map(move |line| DiffLine::new(tag, line))
}

/// Render a diff as plain text, one prefixed line per entry.
pub fn render_diff(lines: &[DiffLine]) -> String {
    let mut buf = String::new();
    for entry in lines {
        let prefix = match entry.tag {
            DiffTag::Context => "    ",
            DiffTag::Removed => " -  ",
            DiffTag::Added => " +  ",
        };
        buf.push_str(prefix);
        buf.push_str(&entry.line);
        buf.push('\n');
    }
    buf
}

fn flush_block(out: &mut Vec<DiffLine>, removed: &mut Vec<DiffLine>, added: &mut Vec<DiffLine>) {
    out.append(removed);
    out.append(added);
}
