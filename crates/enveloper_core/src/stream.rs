//! Result-stream callbacks.
//!
//! When an execute or subscribe call yields a stream, after-hooks can attach
//! [`StreamHooks`]. The pipeline then wraps the stream so that:
//!
//! - every `on_next` runs for every item, in plugin order, and may replace
//!   the item;
//! - `on_end` runs exactly once when the stream finishes normally or the
//!   consumer drops it;
//! - `on_error` runs exactly once, in place of `on_end`, when the source
//!   yields an error. No item follows the error.
//!
//! An error returned by an `on_next` callback is handed to the consumer and
//! ends the stream; `on_end` still runs when the stream is dropped.
//!
//! Callbacks returned for a stream that is never handed out, because a later
//! after-hook replaced it with a single result or failed, get their `on_end`
//! run before the pipeline returns.

use core::fmt;
use std::sync::Arc;

use enveloper_types::{BoxError, BoxFuture, Context, ExecutionArgs, ExecutionResult, ResultStream};
use futures::StreamExt;

use crate::HookResult;

type NextHook = Box<dyn for<'a> FnMut(&'a mut StreamItem) -> BoxFuture<'a, HookResult> + Send>;
type EndHook = Box<dyn FnOnce() + Send>;

/// Callback invoked with a source error before it reaches the consumer.
pub type ErrorHook = Box<dyn FnOnce(&mut SourceError) + Send>;

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// One item of a result stream, as seen by `on_next` callbacks.
pub struct StreamItem {
    args: Arc<ExecutionArgs>,
    result: ExecutionResult,
}

impl StreamItem {
    /// Arguments of the operation producing the stream.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> Context {
        self.args.context()
    }

    /// The item.
    #[must_use]
    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// Mutable access to the item.
    pub fn result_mut(&mut self) -> &mut ExecutionResult {
        &mut self.result
    }

    /// Replaces the item handed to later callbacks and the consumer.
    pub fn set_result(&mut self, result: ExecutionResult) {
        self.result = result;
    }

    pub(crate) fn parts_mut(&mut self) -> (&ExecutionArgs, &mut ExecutionResult) {
        (&self.args, &mut self.result)
    }
}

/// An error raised by a result source: a failing subscribe function or a
/// stream that yields an error.
pub struct SourceError {
    args: Arc<ExecutionArgs>,
    error: BoxError,
}

impl SourceError {
    pub(crate) fn new(args: Arc<ExecutionArgs>, error: BoxError) -> Self {
        Self { args, error }
    }

    pub(crate) fn into_error(self) -> BoxError {
        self.error
    }

    /// Arguments of the failing operation.
    #[must_use]
    pub fn args(&self) -> &ExecutionArgs {
        &self.args
    }

    /// The error.
    #[must_use]
    pub fn error(&self) -> &BoxError {
        &self.error
    }

    /// Replaces the error propagated to the caller.
    pub fn set_error(&mut self, error: impl Into<BoxError>) {
        self.error = error.into();
    }
}

impl fmt::Debug for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceError").field("error", &self.error).finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StreamHooks
// ─────────────────────────────────────────────────────────────────────────────

/// Callbacks a plugin attaches to a result stream.
#[derive(Default)]
#[must_use]
pub struct StreamHooks {
    on_next: Option<NextHook>,
    on_end: Option<EndHook>,
    on_error: Option<ErrorHook>,
}

impl StreamHooks {
    /// Creates an empty set of callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an async per-item callback.
    pub fn on_next<F>(mut self, callback: F) -> Self
    where
        F: for<'a> FnMut(&'a mut StreamItem) -> BoxFuture<'a, HookResult> + Send + 'static,
    {
        self.on_next = Some(Box::new(callback));
        self
    }

    /// Sets a synchronous per-item callback.
    pub fn on_next_sync<F>(self, mut callback: F) -> Self
    where
        F: FnMut(&mut StreamItem) -> HookResult + Send + 'static,
    {
        self.on_next(move |item: &mut StreamItem| {
            let outcome = callback(item);
            Box::pin(futures::future::ready(outcome))
        })
    }

    /// Sets the completion callback.
    pub fn on_end(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    /// Sets the source-error callback.
    pub fn on_error(mut self, callback: impl FnOnce(&mut SourceError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for StreamHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHooks")
            .field("on_next", &self.on_next.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wrapping
// ─────────────────────────────────────────────────────────────────────────────

/// Runs end or error callbacks exactly once, including when dropped.
struct Finalizer {
    args: Arc<ExecutionArgs>,
    on_end: Vec<EndHook>,
    on_error: Vec<ErrorHook>,
    done: bool,
}

impl Finalizer {
    fn end(&mut self) {
        if core::mem::replace(&mut self.done, true) {
            return;
        }
        self.on_error.clear();
        for callback in self.on_end.drain(..) {
            callback();
        }
    }

    fn fail(&mut self, error: BoxError) -> BoxError {
        if core::mem::replace(&mut self.done, true) {
            return error;
        }
        self.on_end.clear();
        let mut payload = SourceError::new(Arc::clone(&self.args), error);
        for callback in self.on_error.drain(..) {
            callback(&mut payload);
        }
        payload.into_error()
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        self.end();
    }
}

struct Wrapped {
    source: ResultStream,
    args: Arc<ExecutionArgs>,
    on_next: Vec<NextHook>,
    finalizer: Finalizer,
    finished: bool,
}

/// Attaches `hooks` to `source`. `source_error_hooks` run before the
/// hooks' own `on_error` callbacks.
pub(crate) fn wrap_stream(
    source: ResultStream,
    args: Arc<ExecutionArgs>,
    hooks: Vec<StreamHooks>,
    source_error_hooks: Vec<ErrorHook>,
) -> ResultStream {
    let mut on_next = Vec::new();
    let mut on_end = Vec::new();
    let mut on_error = source_error_hooks;
    for set in hooks {
        on_next.extend(set.on_next);
        on_end.extend(set.on_end);
        on_error.extend(set.on_error);
    }

    let state = Wrapped {
        source,
        args: Arc::clone(&args),
        on_next,
        finalizer: Finalizer {
            args,
            on_end,
            on_error,
            done: false,
        },
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        match state.source.next().await {
            Some(Ok(result)) => {
                let mut item = StreamItem {
                    args: Arc::clone(&state.args),
                    result,
                };
                for callback in &mut state.on_next {
                    if let Err(error) = callback(&mut item).await {
                        tracing::debug!(%error, "stream item hook failed");
                        state.finished = true;
                        return Some((Err(error), state));
                    }
                }
                Some((Ok(item.result), state))
            }
            Some(Err(error)) => {
                state.finished = true;
                let error = state.finalizer.fail(error);
                Some((Err(error), state))
            }
            None => {
                state.finalizer.end();
                None
            }
        }
    })
    .boxed()
}

/// Runs the `on_end` callbacks of hooks whose stream will never be polled:
/// the stream was replaced by a single result or a later after-hook failed.
pub(crate) fn release(hooks: Vec<StreamHooks>) {
    for callback in hooks.into_iter().filter_map(|set| set.on_end) {
        callback();
    }
}
