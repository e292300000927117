//! The subscribe phase.
//!
//! Mirrors [`execute`](crate::execute) with two additions: plugins can
//! register `on_subscribe_error` handlers, which run when the subscribe
//! function fails or when the source stream yields an error, and the
//! stream's `on_end` callbacks are skipped in the latter case.

use core::fmt;
use std::sync::Arc;

use enveloper_types::{Context, ExecutionOutput, ExecutionResult, SubscribeFn, SubscriptionArgs, Value};

use crate::execute::{ExecuteDoneHook, bind_context, complete};
use crate::hooks::run_before_hooks;
use crate::instrument::{ResolverHook, ResolverInstrumentation};
use crate::phases::extend;
use crate::plugin::Plugin;
use crate::stream::{ErrorHook, SourceError};
use crate::{HookResult, Phase};

// ─────────────────────────────────────────────────────────────────────────────
// OnSubscribe
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of [`Plugin::on_subscribe`].
pub struct OnSubscribe {
    args: SubscriptionArgs,
    subscribe_fn: SubscribeFn,
    early: Option<ExecutionResult>,
}

impl OnSubscribe {
    /// Arguments the subscription will start with.
    #[must_use]
    pub fn args(&self) -> &SubscriptionArgs {
        &self.args
    }

    /// Mutable access to the arguments.
    pub fn args_mut(&mut self) -> &mut SubscriptionArgs {
        &mut self.args
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> Context {
        self.args.context()
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.args.context(), extension);
    }

    /// The subscribe function that will run.
    #[must_use]
    pub fn subscribe_fn(&self) -> &SubscribeFn {
        &self.subscribe_fn
    }

    /// Replaces the subscribe function.
    pub fn set_subscribe_fn(&mut self, subscribe_fn: SubscribeFn) {
        self.subscribe_fn = subscribe_fn;
    }

    /// Supplies a single result instead of a stream. Neither the subscribe
    /// function nor the remaining plugins' `on_subscribe` hooks run.
    pub fn set_result_and_stop_execution(&mut self, result: ExecutionResult) {
        self.early = Some(result);
    }
}

impl fmt::Debug for OnSubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnSubscribe")
            .field("args", &self.args)
            .field("stopped", &self.early.is_some())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SubscribeHooks
// ─────────────────────────────────────────────────────────────────────────────

/// What a plugin asks to be called with during a subscription.
#[derive(Default)]
#[must_use]
pub struct SubscribeHooks {
    on_subscribe_result: Option<ExecuteDoneHook>,
    on_subscribe_error: Option<ErrorHook>,
    on_resolver_called: Option<ResolverHook>,
}

impl SubscribeHooks {
    /// Creates an empty set of hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` once the subscribe function has produced its output.
    pub fn on_subscribe_result(mut self, hook: ExecuteDoneHook) -> Self {
        self.on_subscribe_result = Some(hook);
        self
    }

    /// Runs `handler` if the subscribe function fails or the source stream
    /// yields an error.
    pub fn on_subscribe_error(mut self, handler: impl FnOnce(&mut SourceError) + Send + 'static) -> Self {
        self.on_subscribe_error = Some(Box::new(handler));
        self
    }

    /// Runs `hook` around every field resolver of the subscription.
    pub fn on_resolver_called(mut self, hook: ResolverHook) -> Self {
        self.on_resolver_called = Some(hook);
        self
    }
}

impl fmt::Debug for SubscribeHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeHooks")
            .field("on_subscribe_result", &self.on_subscribe_result.is_some())
            .field("on_subscribe_error", &self.on_subscribe_error.is_some())
            .field("on_resolver_called", &self.on_resolver_called.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the subscribe phase.
pub(crate) async fn subscribe(
    plugins: &[Arc<dyn Plugin>],
    instrumentation: &ResolverInstrumentation,
    context: &Context,
    mut args: SubscriptionArgs,
    subscribe_fn: SubscribeFn,
) -> HookResult<ExecutionOutput> {
    bind_context(&mut args, context);
    let mut hook = OnSubscribe {
        args,
        subscribe_fn,
        early: None,
    };
    let collected = run_before_hooks(
        Phase::Subscribe,
        plugins,
        &mut hook,
        |plugin, hook| plugin.on_subscribe(hook),
        |hook| hook.early.is_some(),
    )
    .await?;

    let mut result_hooks = Vec::new();
    let mut error_hooks = Vec::new();
    let mut resolver_hooks = Vec::new();
    for hooks in collected {
        result_hooks.extend(hooks.on_subscribe_result);
        error_hooks.extend(hooks.on_subscribe_error);
        resolver_hooks.extend(hooks.on_resolver_called);
    }

    let OnSubscribe {
        mut args,
        subscribe_fn,
        early,
    } = hook;
    instrumentation.activate(&mut args, resolver_hooks);

    let output = match early {
        Some(result) => {
            tracing::debug!("subscription stopped early, result supplied by plugin");
            ExecutionOutput::Single(result)
        }
        None => match subscribe_fn(args.clone()).await {
            Ok(output) => output,
            Err(error) => {
                tracing::debug!(%error, "subscribe function failed");
                let mut failure = SourceError::new(Arc::new(args), error);
                for handler in error_hooks {
                    handler(&mut failure);
                }
                return Err(failure.into_error());
            }
        },
    };
    complete(Phase::Subscribe, args, output, result_hooks, error_hooks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::ExecuteDone;
    use crate::hooks::{AfterHook, HookOutcome};
    use crate::stream::StreamHooks;
    use async_trait::async_trait;
    use enveloper_test_utils::{fixtures, parse_document};
    use enveloper_types::{ExecutionArgs, execute_fn};
    use futures::StreamExt;
    use parking_lot::Mutex;

    fn args(source: &str) -> SubscriptionArgs {
        ExecutionArgs::new(fixtures::schema(), parse_document(source).unwrap())
    }

    fn engine() -> SubscribeFn {
        execute_fn(enveloper_test_utils::subscribe)
    }

    #[derive(Default)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Plugin for Journal {
        async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
            let (next, end, stream_error, subscribe_error) =
                (Arc::clone(&self.0), Arc::clone(&self.0), Arc::clone(&self.0), Arc::clone(&self.0));
            Ok(HookOutcome::After(
                SubscribeHooks::new()
                    .on_subscribe_result(AfterHook::sync(move |_: &mut ExecuteDone| {
                        Ok(Some(
                            StreamHooks::new()
                                .on_next_sync(move |_| {
                                    next.lock().push("next".into());
                                    Ok(())
                                })
                                .on_end(move || end.lock().push("end".into()))
                                .on_error(move |_| stream_error.lock().push("stream error".into())),
                        ))
                    }))
                    .on_subscribe_error(move |failure| {
                        subscribe_error.lock().push(format!("subscribe error: {}", failure.error()));
                    }),
            ))
        }
    }

    #[tokio::test]
    async fn source_error_runs_error_handlers_instead_of_end() {
        let journal = Journal::default();
        let log = Arc::clone(&journal.0);
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(journal)];
        let stream = subscribe(&plugins, &ResolverInstrumentation::default(), &Context::new(), args("subscription { faulty(after: 2) }"), engine())
            .await
            .unwrap()
            .into_stream()
            .unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 3);
        assert!(items[2].is_err());
        assert_eq!(
            *log.lock(),
            [
                "next".to_owned(),
                "next".to_owned(),
                format!("subscribe error: {}", fixtures::SOURCE_FAILURE),
                "stream error".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_subscribe_fn_runs_error_handlers() {
        let journal = Journal::default();
        let log = Arc::clone(&journal.0);
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(journal)];
        let rejecting = execute_fn(|_| async { Err("no transport".into()) });
        let error = subscribe(&plugins, &ResolverInstrumentation::default(), &Context::new(), args("subscription { alphabet }"), rejecting)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "no transport");
        assert_eq!(*log.lock(), ["subscribe error: no transport"]);
    }

    #[tokio::test]
    async fn completed_stream_runs_end_once() {
        let journal = Journal::default();
        let log = Arc::clone(&journal.0);
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(journal)];
        let stream = subscribe(&plugins, &ResolverInstrumentation::default(), &Context::new(), args("subscription { alphabet }"), engine())
            .await
            .unwrap()
            .into_stream()
            .unwrap();
        assert_eq!(stream.count().await, 4);
        assert_eq!(*log.lock(), ["next", "next", "next", "next", "end"]);
    }

    #[tokio::test]
    async fn stop_execution_yields_single_result() {
        struct Deny;

        #[async_trait]
        impl Plugin for Deny {
            async fn on_subscribe(&self, hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
                hook.set_result_and_stop_execution(ExecutionResult::from(enveloper_types::GraphQLError::new("denied")));
                Ok(HookOutcome::Continue)
            }
        }

        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Deny)];
        let output = subscribe(&plugins, &ResolverInstrumentation::default(), &Context::new(), args("subscription { alphabet }"), engine())
            .await
            .unwrap();
        assert_eq!(output.into_single().unwrap().errors[0].message, "denied");
    }
}
