//! Load phase: flatten the gated action tree.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures::future::{BoxFuture, FutureExt};
use tracing::{Instrument, debug, debug_span};

use crate::action::{Action, LoadParams};
use crate::context::Context;

/// Depth-first flattening of `actions` under their `can_load` gates.
///
/// An action whose gate resolves to `false` is dropped together with its
/// whole subtree. Loaded parents precede their descendants and siblings keep
/// their declared order. Gate errors abort the load.
pub fn load_actions<'a>(
    context: &'a Context,
    actions: &'a [Arc<Action>],
) -> BoxFuture<'a, Result<Vec<Arc<Action>>>> {
    async move {
        let siblings: Arc<[Arc<Action>]> = actions.iter().cloned().collect();
        let mut loaded = Vec::with_capacity(actions.len());

        for action in actions {
            let child = context.derive_child(action.name());
            if let Some(can_load) = &action.can_load {
                let params = LoadParams {
                    files: child.files().clone(),
                    context: child.clone(),
                    actions: Arc::clone(&siblings),
                };
                let allowed = can_load(params)
                    .instrument(debug_span!("can_load", action = %action.name()))
                    .await
                    .with_context(|| format!("load action `{}`", action.name()))?;
                if !allowed {
                    debug!(action = %action.name(), "skipped: can_load returned false");
                    continue;
                }
            }

            loaded.push(Arc::clone(action));
            debug!(action = %action.name(), "loaded");

            if !action.sub_actions().is_empty() {
                debug!(
                    action = %action.name(),
                    count = action.sub_actions().len(),
                    "loading sub-actions"
                );
                let nested = load_actions(&child, action.sub_actions()).await?;
                loaded.extend(nested);
            }
        }

        Ok(loaded)
    }
    .boxed()
}
