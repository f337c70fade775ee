//! End-to-end pipeline scenarios driven through `run_in`.
//!
//! Each test builds a small action tree, runs every phase against a temp
//! directory and checks the staged files, collected data, emitted events and
//! what actually landed on disk.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Context as _;
use scaffolder::core::diff::DiffTag;
use scaffolder::test_support::{EventRecorder, test_context, test_context_with, test_options};
use scaffolder::{
    Action, OutputEvent, OutputEventKind, RunOptions, WriteFailed, WriteFailurePolicy, run_in,
};
use serde_json::json;

fn shared(actions: Vec<Action>) -> Vec<Arc<Action>> {
    actions.into_iter().map(Arc::new).collect()
}

/// Tree:
/// ```text
/// init    (collects {"name": "demo"})
/// readme  (stages README.md from init.name)
/// ```
#[tokio::test]
async fn data_flows_from_collect_into_staged_files() {
    let (temp, ctx) = test_context();
    let actions = shared(vec![
        Action::new("init").collect_data(|_| async { Ok(json!({"name": "demo"})) }),
        Action::new("readme").action(|params| async move {
            let name = params
                .full_data
                .str_field("init", "name")
                .context("init.name missing")?;
            params.files.write("README.md", format!("# {name}"));
            Ok(())
        }),
    ]);

    let outcome = run_in(ctx, &actions, WriteFailurePolicy::Abort)
        .await
        .expect("run");

    let snapshot = outcome.files().snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("README.md").map(String::as_str), Some("# demo"));
    assert_eq!(
        serde_json::to_value(outcome.data.as_ref()).expect("serialize"),
        json!({"init": {"name": "demo"}})
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("README.md")).expect("read"),
        "# demo"
    );
}

#[tokio::test]
async fn can_load_false_prunes_the_whole_subtree() {
    let (_temp, ctx) = test_context();
    let child_ran = Arc::new(AtomicBool::new(false));

    let child = Action::new("child")
        .can_load({
            let child_ran = Arc::clone(&child_ran);
            move |_| {
                child_ran.store(true, Ordering::SeqCst);
                async { Ok(true) }
            }
        })
        .action(|params| async move {
            params.files.write("child.txt", "child");
            Ok(())
        });
    let parent = Action::new("parent")
        .can_load(|_| async { Ok(false) })
        .with_sub_action(child);
    let sibling = Action::new("sibling").action(|params| async move {
        params.files.write("sibling.txt", "sibling");
        Ok(())
    });

    let outcome = run_in(ctx, &shared(vec![parent, sibling]), WriteFailurePolicy::Abort)
        .await
        .expect("run");

    let names: Vec<&str> = outcome.loaded.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["sibling"]);
    assert!(!child_ran.load(Ordering::SeqCst));
    assert_eq!(outcome.files().paths(), vec!["sibling.txt"]);
}

#[tokio::test]
async fn sub_actions_load_depth_first_after_their_parent() {
    let (_temp, ctx) = test_context();
    let tree = shared(vec![
        Action::new("a").with_sub_actions([
            Action::new("a1").with_sub_action(Action::new("a1x")),
            Action::new("a2"),
        ]),
        Action::new("b"),
    ]);

    let outcome = run_in(ctx, &tree, WriteFailurePolicy::Abort)
        .await
        .expect("run");

    let names: Vec<&str> = outcome.loaded.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["a", "a1", "a1x", "a2", "b"]);
}

#[tokio::test]
async fn dry_run_reports_every_file_without_touching_disk() {
    let (temp, ctx) = test_context_with(RunOptions {
        dry_run: true,
        out_dir: "generated".into(),
        ..test_options()
    });
    let recorder = EventRecorder::attach(ctx.files());
    let actions = shared(vec![Action::new("stage").action(|params| async move {
        params.files.write("Cargo.toml", "[package]\n");
        params.files.write("src/lib.rs", "");
        Ok(())
    })]);

    let outcome = run_in(ctx, &actions, WriteFailurePolicy::Abort)
        .await
        .expect("run");

    assert!(outcome.report.dry_run);
    assert_eq!(outcome.report.written.len(), 2);
    assert_eq!(recorder.count(OutputEventKind::FileWritten), 2);
    assert_eq!(recorder.count(OutputEventKind::WriteDone), 1);
    assert!(!temp.path().join("generated").exists());
    assert_eq!(fs::read_dir(temp.path()).expect("read dir").count(), 0);
}

#[tokio::test]
async fn one_failed_file_does_not_stop_the_others() {
    let (temp, ctx) = test_context();
    // A regular file where a parent directory is needed.
    fs::write(temp.path().join("blocked"), "not a directory").expect("write blocker");
    let recorder = EventRecorder::attach(ctx.files());
    let post_write_ran = Arc::new(AtomicBool::new(false));

    let actions = shared(vec![
        Action::new("stage")
            .action(|params| async move {
                params.files.write("a.txt", "a");
                params.files.write("blocked/b.txt", "b");
                params.files.write("c.txt", "c");
                Ok(())
            })
            .post_write({
                let post_write_ran = Arc::clone(&post_write_ran);
                move |_| {
                    post_write_ran.store(true, Ordering::SeqCst);
                    async { Ok(()) }
                }
            }),
    ]);

    let outcome = run_in(ctx, &actions, WriteFailurePolicy::Continue)
        .await
        .expect("run continues past write failures");

    assert_eq!(recorder.count(OutputEventKind::FileWritten), 2);
    assert_eq!(recorder.count(OutputEventKind::FileError), 1);
    assert_eq!(recorder.count(OutputEventKind::WriteDone), 1);
    assert_eq!(outcome.report.failed.len(), 1);
    assert!(outcome.report.failed[0].path.ends_with("blocked/b.txt"));
    assert_eq!(fs::read_to_string(temp.path().join("a.txt")).expect("a"), "a");
    assert_eq!(fs::read_to_string(temp.path().join("c.txt")).expect("c"), "c");
    assert!(post_write_ran.load(Ordering::SeqCst));

    let error_index = recorder.events().iter().find_map(|event| match event {
        OutputEvent::FileError { index, total, .. } => Some((*index, *total)),
        _ => None,
    });
    assert_eq!(error_index, Some((2, 3)));
}

#[tokio::test]
async fn aborting_on_write_failure_skips_post_write() {
    let (temp, ctx) = test_context();
    fs::write(temp.path().join("blocked"), "not a directory").expect("write blocker");
    let post_write_calls = Arc::new(AtomicUsize::new(0));

    let actions = shared(vec![
        Action::new("stage")
            .action(|params| async move {
                params.files.write("blocked/b.txt", "b");
                params.files.write("ok.txt", "ok");
                Ok(())
            })
            .post_write({
                let calls = Arc::clone(&post_write_calls);
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                }
            }),
    ]);

    let err = run_in(ctx, &actions, WriteFailurePolicy::Abort)
        .await
        .expect_err("write failure aborts");

    let failed = err.downcast_ref::<WriteFailed>().expect("WriteFailed");
    assert_eq!(failed.total, 2);
    assert_eq!(failed.failures.len(), 1);
    assert_eq!(post_write_calls.load(Ordering::SeqCst), 0);
    assert!(temp.path().join("ok.txt").exists());
}

#[tokio::test]
async fn rewrites_keep_history_and_diff_by_origin() {
    let (_temp, ctx) = test_context();
    let actions = shared(vec![
        Action::new("first").action(|params| async move {
            params.files.write("notes.md", "a\nb");
            Ok(())
        }),
        Action::new("second").action(|params| async move {
            let (path, _) = params.files.get("notes.md").context("notes staged")?;
            params.files.write(path, "a\nc");
            Ok(())
        }),
    ]);

    let outcome = run_in(ctx, &actions, WriteFailurePolicy::Abort)
        .await
        .expect("run");
    let files = outcome.files();

    let history = files.get_changes("notes.md").expect("history");
    let origins: Vec<Option<&str>> = history
        .records()
        .iter()
        .map(|change| change.origin.as_deref())
        .collect();
    assert_eq!(origins, vec![Some("first"), Some("second")]);
    assert!(history.records()[0].timestamp <= history.records()[1].timestamp);

    let diff = files.diff("notes.md", -2, -1).expect("diff");
    let tagged: Vec<(DiffTag, &str)> = diff.iter().map(|l| (l.tag, l.line.as_str())).collect();
    assert_eq!(
        tagged,
        vec![
            (DiffTag::Context, "a"),
            (DiffTag::Removed, "b"),
            (DiffTag::Added, "c"),
        ]
    );
    assert!(files.diff("notes.md", 0, 5).is_none());
    assert!(files.diff("missing.md", 0, 1).is_none());
}

#[tokio::test]
async fn hook_failure_stops_the_run_before_writing() {
    let (temp, ctx) = test_context();
    let actions = shared(vec![
        Action::new("stage").action(|params| async move {
            params.files.write("early.txt", "early");
            Ok(())
        }),
        Action::new("broken")
            .action(|_| async { Err(anyhow::anyhow!("template missing")) }),
    ]);

    let err = run_in(ctx, &actions, WriteFailurePolicy::Abort)
        .await
        .expect_err("hook error propagates");

    assert!(format!("{err:#}").contains("template missing"));
    assert!(err.downcast_ref::<WriteFailed>().is_none());
    assert!(!temp.path().join("early.txt").exists());
}
