//! The execute phase.
//!
//! ```text
//! on_execute (each plugin, in order) ──▶ execute fn ──▶ on_execute_done
//!        │                                                   │
//!        └─ set_result_and_stop_execution ───────────────────┘
//! ```
//!
//! `on_execute_done` runs once per registering plugin whether the engine
//! returned a single result or a stream. For streams it may return
//! [`StreamHooks`] to observe or rewrite every item.

use core::fmt;
use std::sync::Arc;

use enveloper_types::{Context, ExecuteFn, ExecutionArgs, ExecutionOutput, ExecutionResult, Value};

use crate::hooks::{AfterHook, collect_after_hooks, run_before_hooks};
use crate::instrument::{ResolverHook, ResolverInstrumentation};
use crate::phases::extend;
use crate::plugin::Plugin;
use crate::stream::{ErrorHook, StreamHooks, StreamItem, release, wrap_stream};
use crate::{HookResult, Phase};

/// After-hook run once the operation has produced its output.
pub type ExecuteDoneHook = AfterHook<ExecuteDone, Option<StreamHooks>>;

// ─────────────────────────────────────────────────────────────────────────────
// OnExecute
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of [`Plugin::on_execute`].
pub struct OnExecute {
    args: ExecutionArgs,
    execute_fn: ExecuteFn,
    early: Option<ExecutionResult>,
}

impl OnExecute {
    /// Arguments the operation will run with.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// Mutable access to the arguments.
    pub fn args_mut(&mut self) -> &mut ExecutionArgs {
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

    /// The execute function that will run.
    #[must_use]
    pub fn execute_fn(&self) -> &ExecuteFn {
        &self.execute_fn
    }

    /// Replaces the execute function.
    pub fn set_execute_fn(&mut self, execute_fn: ExecuteFn) {
        self.execute_fn = execute_fn;
    }

    /// Supplies the result. Neither the execute function nor the
    /// remaining plugins' `on_execute` hooks run; collected after-hooks do.
    pub fn set_result_and_stop_execution(&mut self, result: ExecutionResult) {
        self.early = Some(result);
    }
}

impl fmt::Debug for OnExecute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnExecute")
            .field("args", &self.args)
            .field("stopped", &self.early.is_some())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExecuteHooks
// ─────────────────────────────────────────────────────────────────────────────

/// What a plugin asks to be called with during execution.
#[derive(Default)]
#[must_use]
pub struct ExecuteHooks {
    on_execute_done: Option<ExecuteDoneHook>,
    on_resolver_called: Option<ResolverHook>,
}

impl ExecuteHooks {
    /// Creates an empty set of hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` once the operation has produced its output.
    pub fn on_execute_done(mut self, hook: ExecuteDoneHook) -> Self {
        self.on_execute_done = Some(hook);
        self
    }

    /// Runs `hook` around every field resolver of this operation.
    pub fn on_resolver_called(mut self, hook: ResolverHook) -> Self {
        self.on_resolver_called = Some(hook);
        self
    }
}

impl fmt::Debug for ExecuteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteHooks")
            .field("on_execute_done", &self.on_execute_done.is_some())
            .field("on_resolver_called", &self.on_resolver_called.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExecuteDone
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of `on_execute_done` and `on_subscribe_result` after-hooks.
pub struct ExecuteDone {
    args: Arc<ExecutionArgs>,
    output: ExecutionOutput,
}

impl ExecuteDone {
    /// Arguments the operation ran with.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> Context {
        self.args.context()
    }

    /// The single result, or `None` for a stream.
    #[must_use]
    pub fn result(&self) -> Option<&ExecutionResult> {
        self.output.as_single()
    }

    /// Returns `true` when the operation produced a stream.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.output.is_stream()
    }

    /// Replaces the output with a single result. A stream being replaced is
    /// dropped unconsumed; `on_end` of stream callbacks already returned by
    /// earlier after-hooks still runs.
    pub fn set_result(&mut self, result: ExecutionResult) {
        self.output = ExecutionOutput::Single(result);
    }

    /// Applies `f` to every result the caller will see.
    ///
    /// For a single result `f` runs now and `None` is returned. For a stream
    /// the returned [`StreamHooks`] apply `f` to each item; return them from
    /// the after-hook.
    ///
    /// ```ignore
    /// AfterHook::sync(|done: &mut ExecuteDone| {
    ///     done.for_each_result(|_, result| {
    ///         result.insert_extension("served-by", "edge-1");
    ///         Ok(())
    ///     })
    /// })
    /// ```
    pub fn for_each_result<F>(&mut self, mut f: F) -> HookResult<Option<StreamHooks>>
    where
        F: FnMut(&ExecutionArgs, &mut ExecutionResult) -> HookResult + Send + 'static,
    {
        match &mut self.output {
            ExecutionOutput::Single(result) => {
                f(self.args.as_ref(), result)?;
                Ok(None)
            }
            ExecutionOutput::Stream(_) => Ok(Some(StreamHooks::new().on_next_sync(move |item: &mut StreamItem| {
                let (args, result) = item.parts_mut();
                f(args, result)
            }))),
        }
    }
}

impl fmt::Debug for ExecuteDone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteDone")
            .field("args", &self.args)
            .field("output", &self.output)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Gives `args` the request context unless the caller supplied one.
pub(crate) fn bind_context(args: &mut ExecutionArgs, context: &Context) {
    if args.context_value.is_none() {
        args.context_value = Some(context.clone());
    }
}

/// Runs after-hooks against the output and wraps a stream with the
/// callbacks they returned.
pub(crate) async fn complete(
    phase: Phase,
    args: ExecutionArgs,
    output: ExecutionOutput,
    done_hooks: Vec<ExecuteDoneHook>,
    source_error_hooks: Vec<ErrorHook>,
) -> HookResult<ExecutionOutput> {
    let mut done = ExecuteDone {
        args: Arc::new(args),
        output,
    };
    let mut returned = Vec::with_capacity(done_hooks.len());
    let outcome = collect_after_hooks(phase, done_hooks, &mut done, &mut returned).await;
    let stream_hooks: Vec<StreamHooks> = returned.into_iter().flatten().collect();

    if let Err(error) = outcome {
        release(stream_hooks);
        return Err(error);
    }

    let ExecuteDone { args, output } = done;
    match output {
        ExecutionOutput::Stream(stream) if !stream_hooks.is_empty() || !source_error_hooks.is_empty() => {
            tracing::trace!(%phase, hooks = stream_hooks.len(), "wrapping result stream");
            Ok(ExecutionOutput::Stream(wrap_stream(stream, args, stream_hooks, source_error_hooks)))
        }
        output => {
            if !stream_hooks.is_empty() {
                tracing::trace!(%phase, hooks = stream_hooks.len(), "no stream to wrap, ending stream callbacks");
            }
            release(stream_hooks);
            Ok(output)
        }
    }
}

/// Runs the execute phase.
pub(crate) async fn execute(
    plugins: &[Arc<dyn Plugin>],
    instrumentation: &ResolverInstrumentation,
    context: &Context,
    mut args: ExecutionArgs,
    execute_fn: ExecuteFn,
) -> HookResult<ExecutionOutput> {
    bind_context(&mut args, context);
    let mut hook = OnExecute {
        args,
        execute_fn,
        early: None,
    };
    let collected = run_before_hooks(
        Phase::Execute,
        plugins,
        &mut hook,
        |plugin, hook| plugin.on_execute(hook),
        |hook| hook.early.is_some(),
    )
    .await?;

    let mut done_hooks = Vec::new();
    let mut resolver_hooks = Vec::new();
    for hooks in collected {
        done_hooks.extend(hooks.on_execute_done);
        resolver_hooks.extend(hooks.on_resolver_called);
    }

    let OnExecute {
        mut args,
        execute_fn,
        early,
    } = hook;
    instrumentation.activate(&mut args, resolver_hooks);

    let output = match early {
        Some(result) => {
            tracing::debug!("execution stopped early, result supplied by plugin");
            ExecutionOutput::Single(result)
        }
        None => execute_fn(args.clone()).await?,
    };
    complete(Phase::Execute, args, output, done_hooks, Vec::new()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookOutcome;
    use async_trait::async_trait;
    use enveloper_test_utils::{fixtures, parse_document};
    use enveloper_types::execute_fn;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use serde_json::json;

    fn args(source: &str) -> ExecutionArgs {
        ExecutionArgs::new(fixtures::schema(), parse_document(source).unwrap())
    }

    fn engine() -> ExecuteFn {
        execute_fn(enveloper_test_utils::execute)
    }

    struct Stop;

    #[async_trait]
    impl Plugin for Stop {
        async fn on_execute(&self, hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
            hook.set_result_and_stop_execution(ExecutionResult::from_data(json!({ "cached": true })));
            Ok(HookOutcome::Continue)
        }
    }

    struct Count(Arc<Mutex<usize>>);

    #[async_trait]
    impl Plugin for Count {
        async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
            *self.0.lock() += 1;
            let counter = Arc::clone(&self.0);
            Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
                move |_: &mut ExecuteDone| {
                    *counter.lock() += 10;
                    Ok(None)
                },
            ))))
        }
    }

    struct Stamp;

    #[async_trait]
    impl Plugin for Stamp {
        async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
            Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
                |done: &mut ExecuteDone| {
                    done.for_each_result(|_, result| {
                        result.insert_extension("stamped", true);
                        Ok(())
                    })
                },
            ))))
        }
    }

    #[tokio::test]
    async fn binds_request_context_and_runs_execute_fn() {
        let context = Context::from(json!({ "greeting": "hi" }));
        let output = execute(&[], &ResolverInstrumentation::default(), &context, args("{ fromContext(key: \"greeting\") }"), engine())
            .await
            .unwrap();
        assert_eq!(output.into_single().unwrap().data, Some(json!({ "fromContext": "hi" })));
    }

    #[tokio::test]
    async fn stop_execution_skips_fn_and_later_hooks_but_not_afters() {
        let counter = Arc::new(Mutex::new(0));
        let plugins: Vec<Arc<dyn Plugin>> = vec![
            Arc::new(Count(Arc::clone(&counter))),
            Arc::new(Stop),
            Arc::new(Count(Arc::clone(&counter))),
        ];
        let never = execute_fn(|_| async { panic!("execute fn must not run") });
        let output = execute(&plugins, &ResolverInstrumentation::default(), &Context::new(), args("{ hello }"), never)
            .await
            .unwrap();
        assert_eq!(output.into_single().unwrap().data, Some(json!({ "cached": true })));
        assert_eq!(*counter.lock(), 11);
    }

    #[tokio::test]
    async fn for_each_result_applies_to_single_and_streamed_results() {
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Stamp)];
        let instrumentation = ResolverInstrumentation::default();
        let single = execute(&plugins, &instrumentation, &Context::new(), args("{ hello }"), engine())
            .await
            .unwrap();
        let extensions = single.into_single().unwrap().extensions.unwrap();
        assert_eq!(extensions["stamped"], json!(true));

        let streaming = execute_fn(enveloper_test_utils::subscribe);
        let stream = execute(&plugins, &instrumentation, &Context::new(), args("subscription { countdown(from: 1) }"), streaming)
            .await
            .unwrap()
            .into_stream()
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.as_ref().unwrap().extensions.as_ref().unwrap()["stamped"] == json!(true)));
    }

    #[tokio::test]
    async fn execute_fn_errors_propagate() {
        let failing = execute_fn(|_| async { Err("engine down".into()) });
        let error = execute(&[], &ResolverInstrumentation::default(), &Context::new(), args("{ hello }"), failing)
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "engine down");
    }
}
