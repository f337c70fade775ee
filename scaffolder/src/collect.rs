//! Collect-data phase: build the cumulative data map in load order.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{Instrument, debug, debug_span, instrument};

use crate::action::{Action, CollectParams};
use crate::context::Context;
use crate::core::data::CollectedData;

/// Run `collect_data` for every loaded action, in order.
///
/// Each hook sees only the data returned by actions before it. Actions gated
/// off by `can_collect_data` or without a `collect_data` hook leave no entry.
#[instrument(skip_all, fields(actions = actions.len()))]
pub async fn collect_data(context: &Context, actions: &[Arc<Action>]) -> Result<CollectedData> {
    let mut collected = CollectedData::new();

    for action in actions {
        let child = context.derive_child(action.name());
        let params = CollectParams {
            files: child.files().clone(),
            context: child.clone(),
            up_to_now: Arc::new(collected.clone()),
        };

        if let Some(gate) = &action.can_collect_data {
            let allowed = gate(params.clone())
                .instrument(debug_span!("can_collect_data", action = %action.name()))
                .await
                .with_context(|| format!("check can_collect_data for `{}`", action.name()))?;
            if !allowed {
                debug!(action = %action.name(), "skipped: can_collect_data returned false");
                continue;
            }
        }

        let Some(hook) = &action.collect_data else {
            debug!(action = %action.name(), "no collect_data hook");
            continue;
        };

        let value = hook(params)
            .instrument(debug_span!("collect_data", action = %action.name()))
            .await
            .with_context(|| format!("collect data for `{}`", action.name()))?;
        if collected.contains(action.name()) {
            debug!(action = %action.name(), "replacing data from an earlier action with the same name");
        }
        debug!(action = %action.name(), "data collected");
        collected.insert(action.name(), value);
    }

    Ok(collected)
}
