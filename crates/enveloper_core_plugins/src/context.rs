//! Context extension plugin.

use core::fmt;
use std::future::Future;
use std::sync::Arc;

use enveloper_core::prelude::*;
use enveloper_types::{Context, Value};
use futures::future::BoxFuture;

type ContextFactory = Arc<dyn Fn(Context) -> BoxFuture<'static, HookResult<Value>> + Send + Sync>;

/// Merges the object produced by an async factory into every request
/// context.
///
/// The factory receives the context built so far, so it can derive new
/// entries from ones set by the caller or by earlier plugins. Factory errors
/// reject the request.
///
/// ```ignore
/// ExtendContextPlugin::new(|context| async move {
///     let token = context.get("token");
///     let user = sessions.lookup(token).await?;
///     Ok(json!({ "user": user }))
/// })
/// ```
#[derive(Clone)]
pub struct ExtendContextPlugin {
    factory: ContextFactory,
}

impl ExtendContextPlugin {
    /// Creates the plugin from an async factory.
    #[must_use]
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult<Value>> + Send + 'static,
    {
        Self {
            factory: Arc::new(move |context| -> BoxFuture<'static, HookResult<Value>> { Box::pin(factory(context)) }),
        }
    }

    /// Creates the plugin from a fixed object.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        Self::new(move |_| futures::future::ready(Ok(value.clone())))
    }
}

impl fmt::Debug for ExtendContextPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExtendContextPlugin(..)")
    }
}

#[async_trait]
impl Plugin for ExtendContextPlugin {
    async fn on_context_building(&self, hook: &mut OnContextBuilding) -> HookResult<ContextBuildingOutcome> {
        let extension = (self.factory)(hook.context().clone()).await?;
        hook.extend_context(extension);
        Ok(HookOutcome::Continue)
    }
}
