//! Per-field resolver hooks.
//!
//! When any plugin registers a resolver hook for an operation, the
//! operation runs against an instrumented copy of the schema. Every field
//! resolver of that copy looks up the hooks stored in the request context:
//! before-handlers run in plugin order and may replace the resolver, then
//! the resolver runs, then the collected after-handlers observe and may
//! replace its result. Without stored hooks the wrapped resolver runs as is.
//!
//! The instrumented copy is built once per schema instance and reused.

use core::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use enveloper_types::{
    Context, ExecutionArgs, FieldResult, GraphQLError, Map, ResolveInfo, Resolver, ResolverParams,
    Schema, Value,
};
use parking_lot::Mutex;

use crate::HookResult;
use crate::hooks::HookOutcome;

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of a resolver before-handler.
pub struct ResolverCall {
    params: ResolverParams,
    resolver_fn: Resolver,
}

impl ResolverCall {
    /// The parent value.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.params.root
    }

    /// Coerced field arguments.
    #[must_use]
    pub fn args(&self) -> &Map {
        &self.params.args
    }

    /// The request context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.params.context
    }

    /// Field being resolved.
    #[must_use]
    pub fn info(&self) -> &ResolveInfo {
        &self.params.info
    }

    /// The resolver that will run.
    #[must_use]
    pub fn resolver_fn(&self) -> &Resolver {
        &self.resolver_fn
    }

    /// Replaces the resolver for this field invocation.
    pub fn replace_resolver_fn(&mut self, resolver_fn: Resolver) {
        self.resolver_fn = resolver_fn;
    }
}

/// Payload of a resolver after-handler.
#[derive(Debug)]
pub struct ResolverDone {
    info: ResolveInfo,
    result: FieldResult,
    elapsed: Duration,
}

impl ResolverDone {
    /// Field that was resolved.
    #[must_use]
    pub fn info(&self) -> &ResolveInfo {
        &self.info
    }

    /// The resolved value, or the error the resolver raised.
    #[must_use]
    pub fn result(&self) -> &FieldResult {
        &self.result
    }

    /// Replaces the value handed back to the engine.
    pub fn set_result(&mut self, result: FieldResult) {
        self.result = result;
    }

    /// Time spent in the resolver.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// A callback run after a resolver with its result.
pub struct ResolverAfter(Box<dyn FnOnce(&mut ResolverDone) + Send>);

impl ResolverAfter {
    /// Wraps a callback.
    pub fn new(callback: impl FnOnce(&mut ResolverDone) + Send + 'static) -> Self {
        Self(Box::new(callback))
    }
}

impl fmt::Debug for ResolverAfter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolverAfter(..)")
    }
}

type ResolverHookFn = dyn Fn(&mut ResolverCall) -> HookResult<HookOutcome<ResolverAfter>> + Send + Sync;

/// A handler called before every field resolver of an operation.
///
/// ```ignore
/// ResolverHook::new(|call| {
///     let field = call.info().field_name.clone();
///     Ok(HookOutcome::After(ResolverAfter::new(move |done| {
///         tracing::debug!(field, elapsed = ?done.elapsed(), "resolved");
///     })))
/// })
/// ```
#[derive(Clone)]
pub struct ResolverHook(Arc<ResolverHookFn>);

impl ResolverHook {
    /// Wraps a handler.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut ResolverCall) -> HookResult<HookOutcome<ResolverAfter>> + Send + Sync + 'static,
    {
        Self(Arc::new(handler))
    }
}

impl fmt::Debug for ResolverHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolverHook(..)")
    }
}

/// Resolver hooks registered for one operation, stored in its context.
struct ActiveHooks(Vec<ResolverHook>);

// ─────────────────────────────────────────────────────────────────────────────
// Instrumentation
// ─────────────────────────────────────────────────────────────────────────────

/// Builds and caches instrumented schemas.
#[derive(Default)]
pub(crate) struct ResolverInstrumentation {
    cache: Mutex<Option<(Arc<Schema>, Arc<Schema>)>>,
}

impl ResolverInstrumentation {
    /// Stores `hooks` in the operation context and, when there are any,
    /// points `args` at the instrumented schema.
    pub(crate) fn activate(&self, args: &mut ExecutionArgs, hooks: Vec<ResolverHook>) {
        let context = args.context();
        if hooks.is_empty() {
            context.remove_extension::<ActiveHooks>();
            return;
        }
        tracing::trace!(hooks = hooks.len(), "resolver hooks active");
        context.insert_extension(ActiveHooks(hooks));
        args.schema = self.instrumented(&args.schema);
    }

    fn instrumented(&self, schema: &Arc<Schema>) -> Arc<Schema> {
        if schema.is_instrumented() {
            return Arc::clone(schema);
        }
        let mut cache = self.cache.lock();
        if let Some((source, instrumented)) = cache.as_ref()
            && Arc::ptr_eq(source, schema)
        {
            return Arc::clone(instrumented);
        }
        tracing::debug!("instrumenting schema resolvers");
        let instrumented = Arc::new(schema.instrument_resolvers(|_, _, resolver| instrument(resolver)));
        *cache = Some((Arc::clone(schema), Arc::clone(&instrumented)));
        instrumented
    }
}

fn instrument(inner: Resolver) -> Resolver {
    enveloper_types::resolver(move |params: ResolverParams| {
        let inner = Arc::clone(&inner);
        async move {
            let Some(active) = params.context.extension::<ActiveHooks>() else {
                return inner(params).await;
            };

            let mut call = ResolverCall {
                params,
                resolver_fn: inner,
            };
            let mut afters = Vec::new();
            for hook in &active.0 {
                match (hook.0)(&mut call) {
                    Ok(HookOutcome::After(after)) => afters.push(after),
                    Ok(HookOutcome::Continue) => {}
                    Err(error) => return Err(GraphQLError::from(error)),
                }
            }

            let ResolverCall { params, resolver_fn } = call;
            let info = params.info.clone();
            let started = Instant::now();
            let result = resolver_fn(params).await;
            let mut done = ResolverDone {
                info,
                result,
                elapsed: started.elapsed(),
            };
            for after in afters {
                (after.0)(&mut done);
            }
            done.result
        }
    })
}
