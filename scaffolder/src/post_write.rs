//! Post-write phase: hooks that run once files are on disk.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{Instrument, debug, debug_span, instrument};

use crate::action::{Action, PostWriteParams};
use crate::context::Context;
use crate::core::data::CollectedData;

/// Invoke `post_write` for every loaded action that defines one, in order.
///
/// There is no gate for this phase.
#[instrument(skip_all, fields(actions = actions.len()))]
pub async fn post_write(
    context: &Context,
    actions: &[Arc<Action>],
    data: &Arc<CollectedData>,
) -> Result<()> {
    for action in actions {
        let Some(hook) = &action.post_write else {
            continue;
        };
        let child = context.derive_child(action.name());
        let params = PostWriteParams {
            files: child.files().clone(),
            context: child.clone(),
            data: data.get(action.name()).cloned(),
            full_data: Arc::clone(data),
        };
        hook(params)
            .instrument(debug_span!("post_write", action = %action.name()))
            .await
            .with_context(|| format!("post-write for `{}`", action.name()))?;
        debug!(action = %action.name(), "post-write executed");
    }
    Ok(())
}
