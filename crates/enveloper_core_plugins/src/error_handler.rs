//! Error reporting plugin.

use core::fmt;
use std::sync::Arc;

use enveloper_core::ExecuteDoneHook;
use enveloper_core::prelude::*;
use enveloper_types::{ExecutionArgs, GraphQLError};

type ErrorHandler = Arc<dyn Fn(&[GraphQLError], &ExecutionArgs) + Send + Sync>;

/// Calls a handler with the errors of every result that carries any.
///
/// Single results, every item of a result stream and subscription source
/// failures are all reported. The handler observes; it cannot change the
/// result. The default handler logs each error with `tracing::warn!`.
///
/// ```ignore
/// ErrorHandlerPlugin::new(|errors, args| {
///     for error in errors {
///         sentry::capture_message(&error.message, sentry::Level::Error);
///     }
/// })
/// ```
#[derive(Clone)]
pub struct ErrorHandlerPlugin {
    handler: ErrorHandler,
}

impl ErrorHandlerPlugin {
    /// Creates the plugin with a custom handler.
    #[must_use]
    pub fn new(handler: impl Fn(&[GraphQLError], &ExecutionArgs) + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    fn on_results(&self) -> ExecuteDoneHook {
        let handler = Arc::clone(&self.handler);
        AfterHook::sync(move |done: &mut ExecuteDone| {
            done.for_each_result(move |args, result| {
                if result.has_errors() {
                    handler(&result.errors, args);
                }
                Ok(())
            })
        })
    }
}

impl Default for ErrorHandlerPlugin {
    fn default() -> Self {
        Self::new(|errors, args| {
            for error in errors {
                tracing::warn!(
                    operation = args.operation_name.as_deref(),
                    path = ?error.path,
                    "{}",
                    error.message
                );
            }
        })
    }
}

impl fmt::Debug for ErrorHandlerPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandlerPlugin(..)")
    }
}

#[async_trait]
impl Plugin for ErrorHandlerPlugin {
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(self.on_results())))
    }

    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        let handler = Arc::clone(&self.handler);
        Ok(HookOutcome::After(
            SubscribeHooks::new()
                .on_subscribe_result(self.on_results())
                .on_subscribe_error(move |source| {
                    let error = GraphQLError::from_error(&**source.error());
                    handler(&[error], source.args());
                }),
        ))
    }
}
