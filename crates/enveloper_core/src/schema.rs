//! Schema ownership and change notification.
//!
//! The [`SchemaManager`] holds the current schema of an orchestrator. Any
//! party may replace it: a plugin during initialization, a plugin reacting to
//! another replacement, a plugin holding a [`SchemaHandle`], or the
//! orchestrator owner. Every replacement notifies all initialized plugins
//! except the one that caused it.
//!
//! Replacement is last-write-wins. Notifications from concurrent
//! replacements are not ordered relative to each other, and a plugin that
//! answers every change with another replacement recurses without bound.

use core::fmt;
use std::sync::{Arc, OnceLock, Weak};

use enveloper_types::Schema;
use parking_lot::{Mutex, RwLock};

use crate::plugin::Plugin;

/// Payload of [`Plugin::on_schema_change`].
pub struct SchemaChange {
    schema: Arc<Schema>,
    handle: SchemaHandle,
}

impl SchemaChange {
    /// The new schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Replaces the schema again. The receiving plugin is not notified of
    /// its own replacement.
    pub fn replace_schema(&self, schema: impl Into<Arc<Schema>>) {
        self.handle.replace_schema(schema);
    }

    /// Returns a handle for replacing the schema later.
    #[must_use]
    pub fn handle(&self) -> SchemaHandle {
        self.handle.clone()
    }
}

impl fmt::Debug for SchemaChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaChange").field("origin", &self.handle.origin).finish_non_exhaustive()
    }
}

/// A cloneable capability to replace the schema on behalf of one plugin.
///
/// Holds a weak reference: once the orchestrator is dropped, replacements
/// are ignored.
#[derive(Clone)]
pub struct SchemaHandle {
    manager: Weak<SchemaManager>,
    origin: Option<usize>,
}

impl SchemaHandle {
    pub(crate) fn new(manager: &Arc<SchemaManager>, origin: Option<usize>) -> Self {
        Self {
            manager: Arc::downgrade(manager),
            origin,
        }
    }

    /// Replaces the schema and notifies every plugin but the origin.
    pub fn replace_schema(&self, schema: impl Into<Arc<Schema>>) {
        match self.manager.upgrade() {
            Some(manager) => manager.replace(schema.into(), self.origin),
            None => tracing::debug!("schema replacement ignored, orchestrator dropped"),
        }
    }

    /// Returns the current schema.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Schema>> {
        self.manager.upgrade().and_then(|manager| manager.current())
    }
}

impl fmt::Debug for SchemaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaHandle").field("origin", &self.origin).finish()
    }
}

/// Bookkeeping kept only while plugins are being initialized.
#[derive(Default)]
struct InitProgress {
    /// Plugins whose init has completed.
    processed: Vec<Arc<dyn Plugin>>,
    /// Last schema delivered to (or set by) each plugin, by index.
    observed: Vec<Option<Arc<Schema>>>,
}

impl InitProgress {
    fn observe(&mut self, index: usize, schema: &Arc<Schema>) {
        if self.observed.len() <= index {
            self.observed.resize(index + 1, None);
        }
        self.observed[index] = Some(Arc::clone(schema));
    }

    fn has_observed(&self, index: usize, schema: &Arc<Schema>) -> bool {
        self.observed
            .get(index)
            .and_then(Option::as_ref)
            .is_some_and(|seen| Arc::ptr_eq(seen, schema))
    }
}

/// Owner of the current schema.
#[derive(Default)]
pub(crate) struct SchemaManager {
    current: RwLock<Option<Arc<Schema>>>,
    plugins: OnceLock<Arc<[Arc<dyn Plugin>]>>,
    init: Mutex<Option<InitProgress>>,
}

impl SchemaManager {
    /// Returns the current schema.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Schema>> {
        self.current.read().clone()
    }

    /// Stores `schema` and notifies every listening plugin except `origin`.
    ///
    /// During initialization the listeners are the plugins initialized so
    /// far; afterwards they are all plugins.
    pub(crate) fn replace(self: &Arc<Self>, schema: Arc<Schema>, origin: Option<usize>) {
        *self.current.write() = Some(Arc::clone(&schema));
        tracing::debug!(?origin, "schema replaced");

        let listeners: Vec<Arc<dyn Plugin>> = match self.plugins.get() {
            Some(plugins) => plugins.to_vec(),
            None => {
                let mut init = self.init.lock();
                let progress = init.get_or_insert_with(InitProgress::default);
                if let Some(origin) = origin {
                    progress.observe(origin, &schema);
                }
                progress.processed.clone()
            }
        };

        for (index, plugin) in listeners.iter().enumerate() {
            if Some(index) == origin {
                continue;
            }
            self.notify(index, plugin.as_ref(), &schema);
        }
    }

    fn notify(self: &Arc<Self>, index: usize, plugin: &dyn Plugin, schema: &Arc<Schema>) {
        if let Some(progress) = self.init.lock().as_mut() {
            progress.observe(index, schema);
        }
        tracing::trace!(plugin = plugin.name(), "schema change");
        plugin.on_schema_change(&SchemaChange {
            schema: Arc::clone(schema),
            handle: SchemaHandle::new(self, Some(index)),
        });
    }

    /// Records the plugins initialized before the one about to run.
    pub(crate) fn begin_plugin(&self, processed: &[Arc<dyn Plugin>]) {
        let mut init = self.init.lock();
        let progress = init.get_or_insert_with(InitProgress::default);
        progress.processed = processed.to_vec();
    }

    /// Freezes the plugin list and delivers the final schema to every plugin
    /// that has not observed it yet.
    pub(crate) fn finish_init(self: &Arc<Self>, plugins: Arc<[Arc<dyn Plugin>]>) {
        if self.plugins.set(Arc::clone(&plugins)).is_err() {
            return;
        }
        for (index, plugin) in plugins.iter().enumerate() {
            let Some(schema) = self.current() else {
                break;
            };
            let seen = self
                .init
                .lock()
                .as_ref()
                .is_some_and(|progress| progress.has_observed(index, &schema));
            if !seen {
                self.notify(index, plugin.as_ref(), &schema);
            }
        }
        self.init.lock().take();
    }
}

impl fmt::Debug for SchemaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaManager")
            .field("has_schema", &self.current.read().is_some())
            .field("initialized", &self.plugins.get().is_some())
            .finish()
    }
}
