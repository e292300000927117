//! Plugin initialization.

use std::sync::Arc;

use enveloper_types::Schema;

use super::{Plugin, Plugins};
use crate::schema::{SchemaHandle, SchemaManager};

/// Payload of [`Plugin::on_plugin_init`].
pub struct PluginInit<'a> {
    plugins: &'a [Arc<dyn Plugin>],
    index: usize,
    added: Vec<Arc<dyn Plugin>>,
    schema: &'a Arc<SchemaManager>,
}

impl<'a> PluginInit<'a> {
    /// Snapshot of the plugin list as it stood when this plugin's init began.
    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        self.plugins
    }

    /// Position of the plugin being initialized.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Appends plugins to the end of the list. They are initialized in turn
    /// once the cursor reaches them.
    pub fn add_plugin(&mut self, plugins: impl Plugins) {
        plugins.append_to(&mut self.added);
    }

    /// Sets the schema and notifies every plugin initialized so far.
    pub fn set_schema(&self, schema: impl Into<Arc<Schema>>) {
        self.schema.replace(schema.into(), Some(self.index));
    }

    /// Returns the schema set so far, if any.
    #[must_use]
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.schema.current()
    }

    /// Returns a handle this plugin can keep to replace the schema later.
    ///
    /// Replacements made through the handle do not notify this plugin.
    #[must_use]
    pub fn schema_handle(&self) -> SchemaHandle {
        SchemaHandle::new(self.schema, Some(self.index))
    }
}

/// Runs `on_plugin_init` over a growing list until every entry, including
/// those appended along the way, has been initialized.
///
/// There is no cycle detection: a plugin that keeps adding plugins keeps the
/// loop running.
pub(crate) fn initialize(declared: Vec<Arc<dyn Plugin>>, schema: &Arc<SchemaManager>) -> Arc<[Arc<dyn Plugin>]> {
    let mut plugins = declared;
    let mut index = 0;
    while index < plugins.len() {
        let plugin = Arc::clone(&plugins[index]);
        schema.begin_plugin(&plugins[..index]);
        let added = {
            let mut init = PluginInit {
                plugins: &plugins,
                index,
                added: Vec::new(),
                schema,
            };
            plugin.on_plugin_init(&mut init);
            init.added
        };
        if !added.is_empty() {
            tracing::debug!(plugin = plugin.name(), count = added.len(), "plugins added during init");
        }
        plugins.extend(added);
        index += 1;
    }

    let plugins: Arc<[Arc<dyn Plugin>]> = plugins.into();
    schema.finish_init(Arc::clone(&plugins));
    tracing::debug!(count = plugins.len(), "plugins initialized");
    plugins
}
