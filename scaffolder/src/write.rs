//! Write phase: flush the staged collection and apply the failure policy.

use std::path::{Path, PathBuf};

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::context::Context;
use crate::core::diff::render_diff;
use crate::output::{FlushFailure, FlushReport, OutputCollection, OutputEvent, OutputEventKind};

/// What the write phase does when at least one file could not be persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteFailurePolicy {
    /// Fail the run with [`WriteFailed`] after the flush completes.
    #[default]
    Abort,
    /// Report the failures and keep going with post-write hooks.
    Continue,
}

/// One or more staged files could not be written.
#[derive(Debug, Error)]
#[error("failed to write {} of {total} file(s): {}", .failures.len(), summarize(.failures))]
pub struct WriteFailed {
    pub failures: Vec<FlushFailure>,
    pub total: usize,
}

fn summarize(failures: &[FlushFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Flush the run's collection, reporting each file through `tracing`.
///
/// Paths are reported relative to the context working directory. With
/// change tracking enabled, every path staged more than once also gets its
/// last diff logged at debug level.
#[instrument(skip_all, fields(context = %context.path()))]
pub fn write(context: &Context, policy: WriteFailurePolicy) -> Result<FlushReport> {
    let files = context.files();
    if files.tracks_changes() {
        log_rewrites(files);
    }

    let cwd = context.cwd().to_path_buf();
    let subscriptions = [
        files.on(OutputEventKind::FileWritten, {
            let cwd = cwd.clone();
            move |event| {
                if let OutputEvent::FileWritten { path, index, total } = event {
                    info!("{} ({index}/{total})", display_relative(&cwd, path));
                }
            }
        }),
        files.on(OutputEventKind::FileError, {
            let cwd = cwd.clone();
            move |event| {
                if let OutputEvent::FileError { path, error, .. } = event {
                    error!("{}: {error:#}", display_relative(&cwd, path));
                }
            }
        }),
        files.on(OutputEventKind::WriteDone, move |event| {
            if let OutputEvent::WriteDone { total, .. } = event {
                debug!(total, "flush finished");
            }
        }),
    ];

    let report = files.flush();
    for id in subscriptions {
        files.off(id);
    }

    if report.is_success() {
        if report.dry_run {
            info!("dry run: {} file(s) not written", report.total());
        } else {
            info!("successfully written all files");
        }
        return Ok(report);
    }

    match policy {
        WriteFailurePolicy::Abort => Err(WriteFailed {
            total: report.total(),
            failures: report.failed,
        }
        .into()),
        WriteFailurePolicy::Continue => {
            error!(failed = report.failed.len(), "continuing after write failures");
            Ok(report)
        }
    }
}

fn log_rewrites(files: &OutputCollection) {
    for path in files.paths() {
        let Some(history) = files.get_changes(&path) else {
            continue;
        };
        if history.len() < 2 {
            continue;
        }
        if let Some(lines) = history.diff(-2, -1) {
            debug!(path = %path, versions = history.len(), "changes:\n{}", render_diff(&lines));
        }
    }
}

fn display_relative(cwd: &Path, path: &Path) -> String {
    path.strip_prefix(cwd)
        .map(PathBuf::from)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::RunOptions;
    use std::fs;

    fn context_with(root: &Path, options: RunOptions) -> Context {
        Context::root_in(root, options).expect("context")
    }

    #[test]
    fn writes_staged_files_under_out_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context_with(
            temp.path(),
            RunOptions {
                out_dir: PathBuf::from("generated"),
                ..RunOptions::default()
            },
        );
        ctx.files().write("src/lib.rs", "pub fn hello() {}\n");

        let report = write(&ctx, WriteFailurePolicy::Abort).expect("write");

        assert_eq!(report.written.len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("generated/src/lib.rs")).expect("read"),
            "pub fn hello() {}\n"
        );
    }

    #[test]
    fn abort_policy_turns_failures_into_write_failed() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("blocker"), "").expect("blocker");
        let ctx = context_with(temp.path(), RunOptions::default());
        ctx.files().write("ok.txt", "fine");
        ctx.files().write("blocker/nested.txt", "nope");

        let err = write(&ctx, WriteFailurePolicy::Abort).unwrap_err();

        let failed = err.downcast_ref::<WriteFailed>().expect("WriteFailed");
        assert_eq!(failed.failures.len(), 1);
        assert_eq!(failed.total, 2);
        assert!(err.to_string().contains("failed to write 1 of 2 file(s)"));
        assert!(temp.path().join("ok.txt").exists());
    }

    #[test]
    fn continue_policy_returns_report() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("blocker"), "").expect("blocker");
        let ctx = context_with(temp.path(), RunOptions::default());
        ctx.files().write("blocker/nested.txt", "nope");

        let report = write(&ctx, WriteFailurePolicy::Continue).expect("report");

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
    }

    #[test]
    fn reporting_listeners_are_removed_after_flush() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = context_with(
            temp.path(),
            RunOptions {
                dry_run: true,
                log_changes: true,
                ..RunOptions::default()
            },
        );
        ctx.files().write("a.txt", "one");
        ctx.files().write("a.txt", "two");

        write(&ctx, WriteFailurePolicy::Abort).expect("first");
        let report = write(&ctx, WriteFailurePolicy::Abort).expect("second");

        assert!(report.dry_run);
        assert!(!temp.path().join("a.txt").exists());
    }

    #[test]
    fn relative_display_strips_cwd() {
        assert_eq!(
            display_relative(Path::new("/work"), Path::new("/work/out/a.txt")),
            "out/a.txt"
        );
        assert_eq!(
            display_relative(Path::new("/work"), Path::new("/elsewhere/a.txt")),
            "/elsewhere/a.txt"
        );
    }
}
