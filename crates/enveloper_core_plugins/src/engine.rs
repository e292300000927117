//! Engine installation plugin.

use enveloper_core::prelude::*;
use enveloper_types::Engine;

/// Installs a GraphQL engine's phase functions on every request.
///
/// Each before-hook swaps in the engine's function for its phase, so plugins
/// placed after this one still see, and may wrap, the engine's functions.
/// Use [`OrchestratorBuilder::with_engine`](enveloper_core::OrchestratorBuilder::with_engine)
/// instead when no plugin ordering is needed.
#[derive(Clone, Debug)]
pub struct EnginePlugin {
    engine: Engine,
}

impl EnginePlugin {
    /// Creates the plugin for `engine`.
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Plugin for EnginePlugin {
    async fn on_parse(&self, hook: &mut OnParse) -> HookResult<ParseOutcome> {
        hook.set_parse_fn(self.engine.parse.clone());
        Ok(HookOutcome::Continue)
    }

    async fn on_validate(&self, hook: &mut OnValidate) -> HookResult<ValidateOutcome> {
        hook.set_validation_fn(self.engine.validate.clone());
        Ok(HookOutcome::Continue)
    }

    async fn on_execute(&self, hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        hook.set_execute_fn(self.engine.execute.clone());
        Ok(HookOutcome::Continue)
    }

    async fn on_subscribe(&self, hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        hook.set_subscribe_fn(self.engine.subscribe.clone());
        Ok(HookOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SchemaPlugin;
    use enveloper_core::{OrchestratorError, Phase, PluginGroupBuilder};
    use enveloper_test_utils::fixtures;
    use enveloper_types::{BoxError, ExecutionOutput, ExecutionResult};
    use futures::StreamExt;
    use serde_json::json;

    fn orchestrator(plugins: impl enveloper_core::Plugins) -> Orchestrator {
        Orchestrator::builder()
            .add_plugins(SchemaPlugin::new(fixtures::schema()))
            .add_plugins(plugins)
            .build()
    }

    #[tokio::test]
    async fn runs_queries_without_a_builder_engine() {
        let result = orchestrator(EnginePlugin::new(enveloper_test_utils::engine()))
            .request(None)
            .run("{ greet(name: \"Ada\") }")
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(result.data, Some(json!({ "greet": "Hello, Ada!" })));
    }

    #[tokio::test]
    async fn runs_subscriptions() {
        let stream = orchestrator(EnginePlugin::new(enveloper_test_utils::engine()))
            .request(None)
            .run("subscription { countdown(from: 1) }")
            .await
            .unwrap()
            .into_stream()
            .unwrap();
        assert_eq!(stream.count().await, 2);
    }

    #[tokio::test]
    async fn without_it_parsing_reports_the_missing_engine() {
        let parsed = orchestrator(PluginGroupBuilder::new())
            .request(None)
            .parse("{ hello }")
            .await
            .unwrap();
        assert_eq!(
            parsed.unwrap_err().message,
            OrchestratorError::EngineNotConfigured(Phase::Parse).to_string()
        );
    }

    struct Override;

    #[async_trait]
    impl Plugin for Override {
        async fn on_execute(&self, hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
            hook.set_execute_fn(enveloper_types::execute_fn(|_| async {
                Ok::<_, BoxError>(ExecutionOutput::Single(ExecutionResult::from_data(json!({ "overridden": true }))))
            }));
            Ok(HookOutcome::Continue)
        }
    }

    #[tokio::test]
    async fn later_plugins_can_replace_engine_functions() {
        let result = orchestrator(
            PluginGroupBuilder::new()
                .add(EnginePlugin::new(enveloper_test_utils::engine()))
                .add(Override),
        )
        .request(None)
        .run("{ hello }")
        .await
        .unwrap()
        .into_single()
        .unwrap();
        assert_eq!(result.data, Some(json!({ "overridden": true })));
    }
}
