//! The plugin contract.
//!
//! A plugin is a bundle of optional hooks. Each hook has a default no-op
//! implementation, so a plugin only overrides the phases it cares about.
//! Plugins never talk to each other directly: they cooperate through the
//! payloads and the shared request [`Context`](enveloper_types::Context).
//!
//! # Example
//!
//! ```ignore
//! struct Timing;
//!
//! #[async_trait]
//! impl Plugin for Timing {
//!     async fn on_execute(&self, hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
//!         let started = Instant::now();
//!         hook.extend_context(json!({ "startedAt": now_millis() }));
//!         Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
//!             move |done: &mut ExecuteDone| {
//!                 tracing::info!(elapsed = ?started.elapsed(), "executed");
//!                 Ok(None)
//!             },
//!         ))))
//!     }
//! }
//!
//! let orchestrator = Orchestrator::builder()
//!     .add_plugins(SchemaPlugin::new(schema))
//!     .add_plugins(Timing)
//!     .build();
//! ```

mod init;

pub use init::PluginInit;
pub(crate) use init::initialize;

use std::sync::Arc;

use async_trait::async_trait;

use crate::execute::{ExecuteHooks, OnExecute};
use crate::hooks::HookOutcome;
use crate::phases::{ContextBuildingOutcome, OnContextBuilding, OnParse, OnValidate, ParseOutcome, ValidateOutcome};
use crate::schema::SchemaChange;
use crate::subscribe::{OnSubscribe, SubscribeHooks};
use crate::HookResult;

// ─────────────────────────────────────────────────────────────────────────────
// Plugin Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A set of optional hooks into the GraphQL pipeline.
///
/// Hooks run in plugin-list order. Within one phase every hook is awaited
/// before the next plugin's hook starts, so mutations made by an earlier
/// plugin are visible to later ones.
///
/// Two instances of the same plugin type are distinct entries; the list may
/// hold duplicates.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns the plugin's name for logs. Defaults to the type name.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Called once while the orchestrator is built, in list order.
    ///
    /// Plugins added through [`PluginInit::add_plugin`] are initialized
    /// when the cursor reaches them.
    fn on_plugin_init(&self, _init: &mut PluginInit<'_>) {}

    /// Called whenever another party replaces the schema.
    fn on_schema_change(&self, _change: &SchemaChange) {}

    /// Called when the request context is built.
    async fn on_context_building(&self, _hook: &mut OnContextBuilding) -> HookResult<ContextBuildingOutcome> {
        Ok(HookOutcome::Continue)
    }

    /// Called before the document is parsed.
    async fn on_parse(&self, _hook: &mut OnParse) -> HookResult<ParseOutcome> {
        Ok(HookOutcome::Continue)
    }

    /// Called before the document is validated.
    async fn on_validate(&self, _hook: &mut OnValidate) -> HookResult<ValidateOutcome> {
        Ok(HookOutcome::Continue)
    }

    /// Called before an operation is executed.
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        Ok(HookOutcome::Continue)
    }

    /// Called before a subscription is started.
    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        Ok(HookOutcome::Continue)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugins Trait (for add_plugins polymorphism)
// ─────────────────────────────────────────────────────────────────────────────

/// Types that can be appended to a plugin list: single plugins, shared
/// plugins and [`PluginGroupBuilder`]s.
pub trait Plugins {
    /// Appends these plugins to `list`, preserving order.
    fn append_to(self, list: &mut Vec<Arc<dyn Plugin>>);
}

impl<P: Plugin> Plugins for P {
    fn append_to(self, list: &mut Vec<Arc<dyn Plugin>>) {
        list.push(Arc::new(self));
    }
}

impl Plugins for Arc<dyn Plugin> {
    fn append_to(self, list: &mut Vec<Arc<dyn Plugin>>) {
        list.push(self);
    }
}

impl Plugins for PluginGroupBuilder {
    fn append_to(self, list: &mut Vec<Arc<dyn Plugin>>) {
        list.extend(self.plugins);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginGroup
// ─────────────────────────────────────────────────────────────────────────────

/// A reusable, customizable bundle of plugins.
///
/// ```ignore
/// pub struct Observability;
///
/// impl PluginGroup for Observability {
///     fn build(self) -> PluginGroupBuilder {
///         PluginGroupBuilder::new()
///             .add(TracingPlugin::default())
///             .add(ErrorHandlerPlugin::new(report))
///     }
/// }
///
/// Orchestrator::builder()
///     .add_plugins(Observability.build().disable::<TracingPlugin>())
///     .build();
/// ```
pub trait PluginGroup {
    /// Returns the plugins in this group.
    fn build(self) -> PluginGroupBuilder;
}

/// Ordered list of plugins being assembled into a group.
#[derive(Default)]
pub struct PluginGroupBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginGroupBuilder {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin.
    #[must_use]
    #[expect(
        clippy::should_implement_trait,
        reason = "This is a builder method, not std::ops::Add"
    )]
    pub fn add(mut self, plugins: impl Plugins) -> Self {
        plugins.append_to(&mut self.plugins);
        self
    }

    /// Appends a plugin only when `enabled` is true.
    #[must_use]
    pub fn add_if(self, enabled: bool, plugins: impl Plugins) -> Self {
        if enabled { self.add(plugins) } else { self }
    }

    /// Removes every plugin whose name is the type name of `P`.
    #[must_use]
    pub fn disable<P: Plugin>(mut self) -> Self {
        let target = core::any::type_name::<P>();
        self.plugins.retain(|plugin| plugin.name() != target);
        self
    }

    /// Number of plugins in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Returns the plugin names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }
}
