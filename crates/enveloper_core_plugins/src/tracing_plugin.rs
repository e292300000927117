//! Tracing and request logging plugin.
//!
//! Provides [`TracingPlugin`] which configures the `tracing` subscriber and
//! logs every pipeline phase of every request.
//!
//! # Lifecycle
//!
//! - **`on_plugin_init`** installs the subscriber (unless disabled with
//!   [`TracingPlugin::with_install_subscriber`]). A process can only have one
//!   global subscriber, so a second install is silently skipped.
//! - **`on_context_building`** stores the [`TracingConfig`] as a typed
//!   context extension so resolvers and other plugins can adapt their
//!   logging.
//! - **parse / validate / execute / subscribe** hooks log the phase outcome.
//!
//! # Example
//!
//! ```ignore
//! use enveloper_core_plugins::{TracingFormat, TracingPlugin};
//! use tracing::Level;
//!
//! let orchestrator = Orchestrator::builder()
//!     .add_plugin(SchemaPlugin::new(schema))
//!     .add_plugin(
//!         TracingPlugin::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Json)
//!             .with_skip_introspection(true),
//!     )
//!     .build();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use enveloper_core::prelude::*;
use enveloper_core::{ExecuteDoneHook, Phase, PluginInit};
use enveloper_types::ExecutionArgs;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing configuration, readable from every request context.
///
/// ```ignore
/// let config = context.extension::<TracingConfig>();
/// if config.is_some_and(|config| config.level >= Level::DEBUG) {
///     tracing::debug!(args = ?params.args, "resolving");
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
    /// Whether introspection-only operations are logged.
    pub skip_introspection: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and request logging plugin.
///
/// Configures the `tracing` subscriber and logs each phase of the pipeline:
///
/// | Phase | Level | Fields |
/// |-------|-------|--------|
/// | init | `info` | level, format, plugin count |
/// | schema change | `info` | type count |
/// | parse | `debug` | source length, error |
/// | validate | `debug` | error count |
/// | execute / subscribe start | `info` | operation name |
/// | execute / subscribe completion | `info` | error count or stream, elapsed time |
/// | stream end | `debug` | item count |
/// | subscription source failure | `warn` | error |
///
/// # Environment Filter
///
/// Use `with_env_filter` to set target-specific log levels:
///
/// ```ignore
/// TracingPlugin::default()
///     .with_env_filter("enveloper_core=debug,enveloper_core_plugins=info")
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., `"enveloper_core=debug"`).
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
    /// Skip execute/subscribe logging for introspection-only operations.
    skip_introspection: bool,
    /// Install a global subscriber during init.
    install_subscriber: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            skip_introspection: false,
            install_subscriber: true,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An unparsable filter falls
    /// back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Skips execute and subscribe logging for operations that only query
    /// `__schema`, `__type` or `__typename`.
    #[must_use]
    pub fn with_skip_introspection(mut self, enabled: bool) -> Self {
        self.skip_introspection = enabled;
        self
    }

    /// Controls whether init installs a global subscriber. Disable it when
    /// the application sets up `tracing` itself.
    #[must_use]
    pub fn with_install_subscriber(mut self, enabled: bool) -> Self {
        self.install_subscriber = enabled;
        self
    }

    /// The configuration exposed to request contexts.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
            skip_introspection: self.skip_introspection,
        }
    }

    fn install(&self) {
        let env_filter = match &self.env_filter {
            Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
            None => EnvFilter::new(self.level.as_str()),
        };

        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // try_init().ok(): another subscriber may already be installed
        match self.format {
            TracingFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty().with_span_events(span_events))
                    .try_init()
                    .ok();
            }
            TracingFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact().with_span_events(span_events))
                    .try_init()
                    .ok();
            }
            TracingFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json().with_span_events(span_events))
                    .try_init()
                    .ok();
            }
        }
    }

    fn skips(&self, args: &ExecutionArgs) -> bool {
        self.skip_introspection && args.document.is_introspection(args.operation_name.as_deref())
    }
}

/// Logs completion of an execute or subscribe call, and the end of its
/// stream when it produced one.
fn completion(phase: Phase, operation: Option<String>, started: Instant) -> ExecuteDoneHook {
    AfterHook::sync(move |done: &mut ExecuteDone| {
        if let Some(result) = done.result() {
            tracing::info!(
                %phase,
                operation = operation.as_deref(),
                errors = result.errors.len(),
                elapsed = ?started.elapsed(),
                "operation completed"
            );
            return Ok(None);
        }

        tracing::info!(
            %phase,
            operation = operation.as_deref(),
            elapsed = ?started.elapsed(),
            "operation returned a stream"
        );
        let items = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&items);
        Ok(Some(
            StreamHooks::new()
                .on_next_sync(move |_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
                .on_end(move || {
                    tracing::debug!(
                        %phase,
                        operation = operation.as_deref(),
                        items = items.load(Ordering::Relaxed),
                        elapsed = ?started.elapsed(),
                        "stream ended"
                    );
                }),
        ))
    })
}

#[async_trait]
impl Plugin for TracingPlugin {
    fn on_plugin_init(&self, init: &mut PluginInit<'_>) {
        if self.install_subscriber {
            self.install();
        }
        tracing::info!(
            level = %self.level,
            format = ?self.format,
            plugins = init.plugins().len(),
            "TracingPlugin initialized"
        );
    }

    fn on_schema_change(&self, change: &SchemaChange) {
        tracing::info!(types = change.schema().types().count(), "schema changed");
    }

    async fn on_context_building(&self, hook: &mut OnContextBuilding) -> HookResult<ContextBuildingOutcome> {
        hook.context().insert_extension(self.config());
        Ok(HookOutcome::Continue)
    }

    async fn on_parse(&self, hook: &mut OnParse) -> HookResult<ParseOutcome> {
        let source_len = hook.params().source.len();
        Ok(HookOutcome::After(AfterHook::sync(move |done: &mut ParseDone| {
            match done.result() {
                Ok(_) => tracing::debug!(source_len, "document parsed"),
                Err(error) => tracing::debug!(source_len, %error, "parse failed"),
            }
            Ok(())
        })))
    }

    async fn on_validate(&self, _hook: &mut OnValidate) -> HookResult<ValidateOutcome> {
        Ok(HookOutcome::After(AfterHook::sync(|done: &mut ValidateDone| {
            if done.valid() {
                tracing::debug!("document valid");
            } else {
                tracing::debug!(errors = done.result().len(), "validation failed");
            }
            Ok(())
        })))
    }

    async fn on_execute(&self, hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        if self.skips(hook.args()) {
            return Ok(HookOutcome::Continue);
        }
        let operation = hook.args().operation_name.clone();
        tracing::info!(operation = operation.as_deref(), "executing operation");
        Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(completion(
            Phase::Execute,
            operation,
            Instant::now(),
        ))))
    }

    async fn on_subscribe(&self, hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        if self.skips(hook.args()) {
            return Ok(HookOutcome::Continue);
        }
        let operation = hook.args().operation_name.clone();
        tracing::info!(operation = operation.as_deref(), "starting subscription");
        let failed = operation.clone();
        Ok(HookOutcome::After(
            SubscribeHooks::new()
                .on_subscribe_result(completion(Phase::Subscribe, operation, Instant::now()))
                .on_subscribe_error(move |source| {
                    tracing::warn!(operation = failed.as_deref(), error = %source.error(), "subscription source failed");
                }),
        ))
    }
}
