//! Shared helpers for the pipeline integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use enveloper_core::prelude::*;
use enveloper_core::{Orchestrator, Plugins};
use enveloper_test_utils::fixtures;
use enveloper_types::Value;
use parking_lot::Mutex;

/// Ordered record of hook invocations shared between plugins.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }
}

/// Sets the fixture schema during init.
pub struct ProvideSchema;

impl Plugin for ProvideSchema {
    fn on_plugin_init(&self, init: &mut PluginInit<'_>) {
        init.set_schema(fixtures::schema());
    }
}

/// Merges a fixed JSON object into the context.
pub struct Extend(pub Value);

#[async_trait]
impl Plugin for Extend {
    async fn on_context_building(&self, hook: &mut OnContextBuilding) -> HookResult<ContextBuildingOutcome> {
        hook.extend_context(self.0.clone());
        Ok(HookOutcome::Continue)
    }
}

/// Builds an orchestrator with the fixture schema and the test engine,
/// followed by `plugins`.
pub fn orchestrator(plugins: impl Plugins) -> Orchestrator {
    Orchestrator::builder()
        .add_plugins(ProvideSchema)
        .add_plugins(plugins)
        .with_engine(enveloper_test_utils::engine())
        .build()
}
