//! Stock plugins for enveloper.
//!
//! This crate provides the plugins most deployments need:
//!
//! - [`SchemaPlugin`] - Installs a fixed schema
//! - [`EnginePlugin`] - Installs a GraphQL engine's phase functions
//! - [`ExtendContextPlugin`] - Merges an async factory's output into the context
//! - [`TracingPlugin`] - Logging and observability via the `tracing` crate
//! - [`ErrorHandlerPlugin`] - Reports errors of single and streamed results
//! - [`PayloadFormatterPlugin`] - Rewrites every result
//! - [`DefaultPlugins`] - Convenient bundle of schema, engine, tracing and error reporting
//!
//! # Example
//!
//! ```ignore
//! use enveloper_core::{Orchestrator, PluginGroup};
//! use enveloper_core_plugins::DefaultPlugins;
//!
//! let orchestrator = Orchestrator::builder()
//!     .add_plugins(DefaultPlugins::new(schema, engine).build())
//!     .build();
//! ```
//!
//! # Individual Plugin Usage
//!
//! For fine-grained control, add plugins individually:
//!
//! ```ignore
//! use enveloper_core_plugins::{EnginePlugin, SchemaPlugin, TracingPlugin};
//! use tracing::Level;
//!
//! let orchestrator = Orchestrator::builder()
//!     .add_plugin(SchemaPlugin::new(schema))
//!     .add_plugin(EnginePlugin::new(engine))
//!     .add_plugin(TracingPlugin::default().with_level(Level::DEBUG))
//!     .build();
//! ```

mod context;
mod engine;
mod error_handler;
mod payload_formatter;
mod schema;
mod tracing_plugin;

pub use context::ExtendContextPlugin;
pub use engine::EnginePlugin;
pub use error_handler::ErrorHandlerPlugin;
pub use payload_formatter::PayloadFormatterPlugin;
pub use schema::SchemaPlugin;
pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};

use std::sync::Arc;

use enveloper_core::{PluginGroup, PluginGroupBuilder};
use enveloper_types::{Engine, Schema};

/// Default plugins for most deployments.
///
/// Includes:
/// - [`SchemaPlugin`] - The given schema
/// - [`EnginePlugin`] - The given engine
/// - [`TracingPlugin`] - Logging and observability
/// - [`ErrorHandlerPlugin`] - Logs result errors
///
/// # Customization
///
/// ```ignore
/// Orchestrator::builder()
///     .add_plugins(
///         DefaultPlugins::new(schema, engine)
///             .build()
///             .disable::<TracingPlugin>()
///     )
///     .build();
/// ```
pub struct DefaultPlugins {
    schema: Arc<Schema>,
    engine: Engine,
}

impl DefaultPlugins {
    /// Bundles `schema` and `engine` with the default observability plugins.
    #[must_use]
    pub fn new(schema: impl Into<Arc<Schema>>, engine: Engine) -> Self {
        Self {
            schema: schema.into(),
            engine,
        }
    }
}

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(SchemaPlugin::new(self.schema))
            .add(EnginePlugin::new(self.engine))
            .add(TracingPlugin::default())
            .add(ErrorHandlerPlugin::default())
    }
}

/// Schema and engine only.
///
/// Does not include tracing, making it suitable for unit tests that don't
/// need logging output.
pub struct MinimalPlugins {
    schema: Arc<Schema>,
    engine: Engine,
}

impl MinimalPlugins {
    /// Bundles `schema` and `engine`.
    #[must_use]
    pub fn new(schema: impl Into<Arc<Schema>>, engine: Engine) -> Self {
        Self {
            schema: schema.into(),
            engine,
        }
    }
}

impl PluginGroup for MinimalPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::new()
            .add(SchemaPlugin::new(self.schema))
            .add(EnginePlugin::new(self.engine))
    }
}
