//! Orchestration of a full pipeline run.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::action::Action;
use crate::collect::collect_data;
use crate::context::Context;
use crate::core::data::CollectedData;
use crate::execute::execute_actions;
use crate::io::config::RunOptions;
use crate::load::load_actions;
use crate::output::{FlushReport, OutputCollection};
use crate::post_write::post_write;
use crate::write::{WriteFailurePolicy, write};

/// The fixed phases every run passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    CollectData,
    Execute,
    Write,
    PostWrite,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Load => "load",
            Phase::CollectData => "collect-data",
            Phase::Execute => "execute",
            Phase::Write => "write",
            Phase::PostWrite => "post-write",
        };
        f.write_str(label)
    }
}

/// State left behind by a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Root context of the run.
    pub context: Context,
    /// Loaded actions, in load order.
    pub loaded: Vec<Arc<Action>>,
    pub data: Arc<CollectedData>,
    pub report: FlushReport,
}

impl RunOutcome {
    pub fn files(&self) -> &OutputCollection {
        self.context.files()
    }
}

/// Run `actions` through every phase in a fresh root context.
pub async fn run(actions: Vec<Action>, options: RunOptions) -> Result<RunOutcome> {
    let context = Context::root(options)?;
    let actions: Vec<Arc<Action>> = actions.into_iter().map(Arc::new).collect();
    run_in(context, &actions, WriteFailurePolicy::default()).await
}

/// Run `actions` through every phase using a caller-built root context.
///
/// Phases run strictly in sequence over the same load-ordered list. Any hook
/// error aborts the run at that point; files already flushed stay on disk.
#[instrument(skip_all, fields(context = %context.path(), actions = actions.len()))]
pub async fn run_in(
    context: Context,
    actions: &[Arc<Action>],
    policy: WriteFailurePolicy,
) -> Result<RunOutcome> {
    debug!(phase = %Phase::Load, "starting phase");
    let loaded = load_actions(&context, actions).await?;
    debug!(phase = %Phase::Load, loaded = loaded.len(), "phase finished");

    debug!(phase = %Phase::CollectData, "starting phase");
    let data = Arc::new(collect_data(&context, &loaded).await?);
    debug!(phase = %Phase::CollectData, entries = data.len(), "phase finished");

    debug!(phase = %Phase::Execute, "starting phase");
    execute_actions(&context, &loaded, &data).await?;
    debug!(phase = %Phase::Execute, staged = context.files().len(), "phase finished");

    debug!(phase = %Phase::Write, "starting phase");
    let report = write(&context, policy)?;
    debug!(phase = %Phase::Write, written = report.written.len(), "phase finished");

    debug!(phase = %Phase::PostWrite, "starting phase");
    post_write(&context, &loaded, &data).await?;
    debug!(phase = %Phase::PostWrite, "phase finished");

    Ok(RunOutcome {
        context,
        loaded,
        data,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_context;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn phases_run_in_fixed_order() {
        let (_temp, ctx) = test_context();
        let trace = Arc::new(Mutex::new(Vec::new()));
        let record = |label: &'static str| {
            let trace = Arc::clone(&trace);
            move || trace.lock().push(label)
        };

        let action = Action::new("only")
            .can_load({
                let hit = record("can_load");
                move |_| {
                    hit();
                    async { Ok(true) }
                }
            })
            .can_collect_data({
                let hit = record("can_collect_data");
                move |_| {
                    hit();
                    async { Ok(true) }
                }
            })
            .collect_data({
                let hit = record("collect_data");
                move |_| {
                    hit();
                    async { Ok(serde_json::json!({})) }
                }
            })
            .can_execute_action({
                let hit = record("can_execute_action");
                move |_| {
                    hit();
                    async { Ok(true) }
                }
            })
            .action({
                let hit = record("action");
                move |params| {
                    hit();
                    params.files.write("out.txt", "x");
                    async { Ok(()) }
                }
            })
            .post_write({
                let hit = record("post_write");
                move |_| {
                    hit();
                    async { Ok(()) }
                }
            });

        let outcome = run_in(ctx, &[Arc::new(action)], WriteFailurePolicy::Abort)
            .await
            .expect("run");

        assert_eq!(
            *trace.lock(),
            vec![
                "can_load",
                "can_collect_data",
                "collect_data",
                "can_execute_action",
                "action",
                "post_write",
            ]
        );
        assert_eq!(outcome.report.written.len(), 1);
        assert_eq!(outcome.loaded.len(), 1);
    }

    #[test]
    fn phase_labels() {
        assert_eq!(Phase::CollectData.to_string(), "collect-data");
        assert_eq!(Phase::PostWrite.to_string(), "post-write");
    }
}
