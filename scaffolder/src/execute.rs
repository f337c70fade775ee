//! Execute phase: run each loaded action's body with the complete data.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::{Instrument, debug, debug_span, instrument};

use crate::action::{Action, ActionParams, ExecuteGateParams};
use crate::context::Context;
use crate::core::data::CollectedData;

/// Invoke `action` for every loaded action, in order.
///
/// `can_execute_action` returning `false` or a missing `action` hook skips
/// the action. Files staged by the hooks land in the shared collection,
/// attributed to the action that staged them.
#[instrument(skip_all, fields(actions = actions.len()))]
pub async fn execute_actions(
    context: &Context,
    actions: &[Arc<Action>],
    data: &Arc<CollectedData>,
) -> Result<()> {
    let loaded: Arc<[Arc<Action>]> = actions.iter().cloned().collect();

    for action in actions {
        let child = context.derive_child(action.name());

        if let Some(gate) = &action.can_execute_action {
            let params = ExecuteGateParams {
                files: child.files().clone(),
                context: child.clone(),
                full_data: Arc::clone(data),
            };
            let allowed = gate(params)
                .instrument(debug_span!("can_execute_action", action = %action.name()))
                .await
                .with_context(|| format!("check can_execute_action for `{}`", action.name()))?;
            if !allowed {
                debug!(action = %action.name(), "skipped: can_execute_action returned false");
                continue;
            }
        }

        let Some(hook) = &action.action else {
            debug!(action = %action.name(), "no action hook");
            continue;
        };

        let params = ActionParams {
            files: child.files().clone(),
            context: child.clone(),
            actions: Arc::clone(&loaded),
            data: data.get(action.name()).cloned(),
            full_data: Arc::clone(data),
        };
        hook(params)
            .instrument(debug_span!("action", action = %action.name()))
            .await
            .with_context(|| format!("execute action `{}`", action.name()))?;
        debug!(action = %action.name(), "executed");
    }

    Ok(())
}
