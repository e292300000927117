use std::sync::Arc;

use enveloper_types::{Context, Value};

use super::extend;
use crate::hooks::{AfterHook, HookOutcome, run_after_hooks, run_before_hooks};
use crate::plugin::Plugin;
use crate::{HookResult, Phase};

/// What [`Plugin::on_context_building`] may return.
pub type ContextBuildingOutcome = HookOutcome<AfterHook<ContextBuilt>>;

/// Payload of [`Plugin::on_context_building`].
#[derive(Debug)]
pub struct OnContextBuilding {
    context: Context,
    stopped: bool,
}

impl OnContextBuilding {
    /// The context being built.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.context, extension);
    }

    /// Skips the context-building hooks of the remaining plugins.
    pub fn break_context_building(&mut self) {
        self.stopped = true;
    }
}

/// Payload of context-building after-hooks.
#[derive(Debug)]
pub struct ContextBuilt {
    context: Context,
}

impl ContextBuilt {
    /// The finished context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.context, extension);
    }
}

/// Runs the context-building hooks against `context` and returns it.
pub(crate) async fn build_context(plugins: &[Arc<dyn Plugin>], context: Context) -> HookResult<Context> {
    let mut hook = OnContextBuilding {
        context,
        stopped: false,
    };
    let afters = run_before_hooks(
        Phase::ContextBuilding,
        plugins,
        &mut hook,
        |plugin, hook| plugin.on_context_building(hook),
        |hook| hook.stopped,
    )
    .await?;

    let mut built = ContextBuilt { context: hook.context };
    run_after_hooks(Phase::ContextBuilding, afters, &mut built).await?;
    Ok(built.context)
}
