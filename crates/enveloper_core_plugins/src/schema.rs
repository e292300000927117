//! Fixed-schema plugin.

use std::sync::Arc;

use enveloper_core::{Plugin, PluginInit};
use enveloper_types::Schema;

/// Sets a fixed schema during initialization.
///
/// Plugins later in the list see the schema through
/// [`Plugin::on_schema_change`] and may still replace it.
#[derive(Clone)]
pub struct SchemaPlugin {
    schema: Arc<Schema>,
}

impl SchemaPlugin {
    /// Creates the plugin for `schema`.
    #[must_use]
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self { schema: schema.into() }
    }

    /// The schema this plugin installs.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

impl Plugin for SchemaPlugin {
    fn on_plugin_init(&self, init: &mut PluginInit<'_>) {
        init.set_schema(Arc::clone(&self.schema));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enveloper_core::Orchestrator;
    use enveloper_test_utils::fixtures;

    #[test]
    fn installs_its_schema_during_build() {
        let schema = fixtures::schema();
        let orchestrator = Orchestrator::new(SchemaPlugin::new(Arc::clone(&schema)));
        assert!(Arc::ptr_eq(&orchestrator.schema().unwrap(), &schema));
    }

    #[test]
    fn later_plugin_wins() {
        let first = fixtures::schema();
        let second = fixtures::schema();
        let orchestrator = Orchestrator::builder()
            .add_plugin(SchemaPlugin::new(first))
            .add_plugin(SchemaPlugin::new(Arc::clone(&second)))
            .build();
        assert!(Arc::ptr_eq(&orchestrator.schema().unwrap(), &second));
    }
}
