//! Result formatting plugin.

use core::fmt;
use std::sync::Arc;

use enveloper_core::ExecuteDoneHook;
use enveloper_core::prelude::*;
use enveloper_types::{ExecutionArgs, ExecutionResult};

type Formatter = Arc<dyn Fn(ExecutionResult, &ExecutionArgs) -> ExecutionResult + Send + Sync>;

/// Replaces every result with the output of a formatter.
///
/// Applies to single results and to each item of a result stream, for both
/// execute and subscribe. Plugins after this one see the formatted result.
///
/// ```ignore
/// PayloadFormatterPlugin::new(|mut result, args| {
///     result.insert_extension("operation", args.operation_name.clone());
///     result
/// })
/// ```
#[derive(Clone)]
pub struct PayloadFormatterPlugin {
    formatter: Formatter,
}

impl PayloadFormatterPlugin {
    /// Creates the plugin from a formatter.
    #[must_use]
    pub fn new(formatter: impl Fn(ExecutionResult, &ExecutionArgs) -> ExecutionResult + Send + Sync + 'static) -> Self {
        Self {
            formatter: Arc::new(formatter),
        }
    }

    fn on_results(&self) -> ExecuteDoneHook {
        let formatter = Arc::clone(&self.formatter);
        AfterHook::sync(move |done: &mut ExecuteDone| {
            done.for_each_result(move |args, result| {
                *result = formatter(core::mem::take(result), args);
                Ok(())
            })
        })
    }
}

impl fmt::Debug for PayloadFormatterPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadFormatterPlugin(..)")
    }
}

#[async_trait]
impl Plugin for PayloadFormatterPlugin {
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(self.on_results())))
    }

    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        Ok(HookOutcome::After(SubscribeHooks::new().on_subscribe_result(self.on_results())))
    }
}
