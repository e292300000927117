use std::sync::Arc;

use enveloper_types::BoxFuture;

use super::{AfterHook, HookOutcome};
use crate::plugin::Plugin;
use crate::{HookResult, Phase};

/// Runs one before-hook per plugin, in list order, awaiting each before the
/// next starts.
///
/// `invoke` selects the hook to call; `halted` is checked after every hook
/// and stops the loop once it returns `true`. Returns the after-hooks in the
/// order they were collected.
pub(crate) async fn run_before_hooks<P, A, I, H>(
    phase: Phase,
    plugins: &[Arc<dyn Plugin>],
    payload: &mut P,
    invoke: I,
    halted: H,
) -> HookResult<Vec<A>>
where
    P: Send,
    I: for<'a> Fn(&'a dyn Plugin, &'a mut P) -> BoxFuture<'a, HookResult<HookOutcome<A>>>,
    H: Fn(&P) -> bool,
{
    let mut collected = Vec::new();
    for plugin in plugins {
        tracing::trace!(%phase, plugin = plugin.name(), "before hook");
        let outcome = invoke(plugin.as_ref(), payload).await.inspect_err(|error| {
            tracing::debug!(%phase, plugin = plugin.name(), %error, "before hook failed");
        })?;
        if let HookOutcome::After(after) = outcome {
            collected.push(after);
        }
        if halted(payload) {
            tracing::debug!(%phase, plugin = plugin.name(), "remaining before hooks skipped");
            break;
        }
    }
    Ok(collected)
}

/// Runs collected after-hooks in collection order against the result payload.
pub(crate) async fn run_after_hooks<P, R>(
    phase: Phase,
    hooks: Vec<AfterHook<P, R>>,
    payload: &mut P,
) -> HookResult<Vec<R>>
where
    P: Send,
{
    let mut outputs = Vec::with_capacity(hooks.len());
    collect_after_hooks(phase, hooks, payload, &mut outputs).await?;
    Ok(outputs)
}

/// Like [`run_after_hooks`], but pushes into `outputs` so the caller keeps
/// what the hooks before a failing one returned.
pub(crate) async fn collect_after_hooks<P, R>(
    phase: Phase,
    hooks: Vec<AfterHook<P, R>>,
    payload: &mut P,
    outputs: &mut Vec<R>,
) -> HookResult
where
    P: Send,
{
    for (index, hook) in hooks.into_iter().enumerate() {
        tracing::trace!(%phase, index, "after hook");
        outputs.push(hook.call(payload).await?);
    }
    Ok(())
}
