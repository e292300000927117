//! # enveloper Internal Library
//!
//! Re-exports the enveloper crates for convenience.

/// GraphQL data model and engine seams.
pub use enveloper_types;

/// Plugin registry, hook combinator and phase pipelines.
pub use enveloper_core;

/// Stock plugins.
pub use enveloper_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use enveloper_core::prelude::*;
    pub use enveloper_core::{GraphQLParams, PluginGroupBuilder, Plugins, Request};
    pub use enveloper_core_plugins::{
        DefaultPlugins, EnginePlugin, ErrorHandlerPlugin, ExtendContextPlugin, MinimalPlugins, PayloadFormatterPlugin,
        SchemaPlugin, TracingFormat, TracingPlugin,
    };
    pub use enveloper_types::{
        BoxError, Context, Document, Engine, ExecutionArgs, ExecutionOutput, ExecutionResult, GraphQLError, Schema,
    };
}
