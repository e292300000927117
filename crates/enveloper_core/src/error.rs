//! Core error types.

use core::fmt;

use enveloper_types::BoxError;

/// Result of a plugin hook. Errors abort the running phase and reach the
/// caller unchanged.
pub type HookResult<T = ()> = Result<T, BoxError>;

/// The pipeline phases plugins can hook into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Plugin initialization.
    PluginInit,
    /// Schema replacement notifications.
    SchemaChange,
    /// Context building.
    ContextBuilding,
    /// Parsing.
    Parse,
    /// Validation.
    Validate,
    /// Execution.
    Execute,
    /// Subscription.
    Subscribe,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PluginInit => "plugin_init",
            Self::SchemaChange => "schema_change",
            Self::ContextBuilding => "context_building",
            Self::Parse => "parse",
            Self::Validate => "validate",
            Self::Execute => "execute",
            Self::Subscribe => "subscribe",
        })
    }
}

/// Errors originating in the orchestrator itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    /// No plugin provided a schema during initialization.
    #[error("no schema has been set; add a plugin that calls `set_schema` during initialization")]
    SchemaNotSet,
    /// The phase function was never supplied.
    #[error("no {0} function is configured; install an engine plugin or call `with_engine`")]
    EngineNotConfigured(Phase),
    /// The requested operation does not exist in the document.
    #[error("operation {} not found in document", .0.as_deref().unwrap_or("<anonymous>"))]
    UnknownOperation(Option<String>),
}
