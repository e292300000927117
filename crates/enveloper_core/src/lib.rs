//! Plugin-hook orchestration for GraphQL execution pipelines.
//!
//! An [`Orchestrator`] owns an ordered list of [`Plugin`]s and the current
//! [`Schema`](enveloper_types::Schema). For each request it exposes the
//! pipeline phases as functions bound to one shared
//! [`Context`](enveloper_types::Context):
//!
//! | Phase | Before-hook | After-hook payload |
//! |-------|-------------|--------------------|
//! | context building | [`Plugin::on_context_building`] | [`ContextBuilt`] |
//! | parse | [`Plugin::on_parse`] | [`ParseDone`] |
//! | validate | [`Plugin::on_validate`] | [`ValidateDone`] |
//! | execute | [`Plugin::on_execute`] | [`ExecuteDone`], then [`StreamItem`]s |
//! | subscribe | [`Plugin::on_subscribe`] | [`ExecuteDone`], then [`StreamItem`]s |
//!
//! Before-hooks run in plugin order and may replace the phase function,
//! supply its result, or enrich the context. Each may hand back an
//! after-hook that runs once the phase function has finished. Execute and
//! subscribe can additionally wrap every field resolver.
//!
//! The core knows nothing about a concrete GraphQL engine: the phase
//! functions come from an [`Engine`](enveloper_types::Engine) passed to the
//! builder or installed by a plugin.

mod error;
mod execute;
mod hooks;
mod instrument;
mod orchestrator;
mod phases;
mod plugin;
mod schema;
mod stream;
mod subscribe;

pub use error::{HookResult, OrchestratorError, Phase};
pub use execute::{ExecuteDone, ExecuteDoneHook, ExecuteHooks, OnExecute};
pub use hooks::{AfterHook, HookOutcome};
pub use instrument::{ResolverAfter, ResolverCall, ResolverDone, ResolverHook};
pub use orchestrator::{GraphQLParams, Orchestrator, OrchestratorBuilder, Request};
pub use phases::{
    ContextBuildingOutcome, ContextBuilt, OnContextBuilding, OnParse, OnValidate, ParseDone, ParseOutcome,
    ValidateDone, ValidateOutcome,
};
pub use plugin::{Plugin, PluginGroup, PluginGroupBuilder, PluginInit, Plugins};
pub use schema::{SchemaChange, SchemaHandle};
pub use stream::{ErrorHook, SourceError, StreamHooks, StreamItem};
pub use subscribe::{OnSubscribe, SubscribeHooks};

/// Re-exported so plugin crates implement [`Plugin`] with the same macro.
pub use async_trait::async_trait;

/// Commonly used types for writing plugins.
pub mod prelude {
    pub use crate::{
        AfterHook, ContextBuildingOutcome, ContextBuilt, ExecuteDone, ExecuteHooks, HookOutcome, HookResult,
        OnContextBuilding, OnExecute, OnParse, OnSubscribe, OnValidate, Orchestrator, ParseDone, ParseOutcome,
        Plugin, PluginGroup, PluginGroupBuilder, PluginInit, ResolverAfter, ResolverHook, SchemaChange,
        StreamHooks, SubscribeHooks, ValidateDone, ValidateOutcome, async_trait,
    };
}
