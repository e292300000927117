//! The orchestrator and per-request entry points.
//!
//! An [`Orchestrator`] is built once from an ordered plugin list; building it
//! runs every plugin's init hook. Each incoming request then calls
//! [`Orchestrator::request`] to get a [`Request`]: a set of phase functions
//! sharing one [`Context`].
//!
//! ```ignore
//! let orchestrator = Orchestrator::builder()
//!     .add_plugins(SchemaPlugin::new(schema))
//!     .add_plugins(EnginePlugin::new(engine))
//!     .add_plugins(TracingPlugin::default())
//!     .build();
//!
//! let request = orchestrator.request(json!({ "user": "ada" }));
//! let output = request.run("{ hello }").await?;
//! ```

use core::fmt;
use std::sync::Arc;

use enveloper_types::{
    BoxError, Context, Document, Engine, ExecutionArgs, ExecutionOutput, ExecutionResult, GraphQLError, Map, OperationKind,
    ParseParams, ParseResult, Schema, SubscriptionArgs, ValidateParams, Value, execute_fn, parse_fn, validate_fn,
};
use serde::Deserialize;
use tracing::Instrument;

use crate::instrument::ResolverInstrumentation;
use crate::plugin::{Plugin, Plugins, initialize};
use crate::schema::{SchemaHandle, SchemaManager};
use crate::{HookResult, OrchestratorError, Phase, execute, phases, subscribe};

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Collects plugins and an optional default engine.
#[derive(Default)]
#[must_use]
pub struct OrchestratorBuilder {
    plugins: Vec<Arc<dyn Plugin>>,
    engine: Option<Engine>,
}

impl OrchestratorBuilder {
    /// Appends one plugin.
    pub fn add_plugin(self, plugin: impl Plugin) -> Self {
        self.add_plugins(plugin)
    }

    /// Appends plugins, preserving order.
    pub fn add_plugins(mut self, plugins: impl Plugins) -> Self {
        plugins.append_to(&mut self.plugins);
        self
    }

    /// Sets the phase functions used when no plugin replaces them.
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Initializes every plugin and returns the orchestrator.
    pub fn build(self) -> Orchestrator {
        let schema = Arc::new(SchemaManager::default());
        let plugins = initialize(self.plugins, &schema);
        tracing::debug!(
            plugins = plugins.len(),
            has_schema = schema.current().is_some(),
            "orchestrator built"
        );
        Orchestrator {
            state: Arc::new(State {
                plugins,
                schema,
                engine: self.engine.unwrap_or_else(unconfigured_engine),
                instrumentation: ResolverInstrumentation::default(),
            }),
        }
    }
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.plugins.iter().map(|plugin| plugin.name()).collect();
        f.debug_struct("OrchestratorBuilder")
            .field("plugins", &names)
            .field("engine", &self.engine.is_some())
            .finish()
    }
}

/// Phase functions that report the missing engine.
fn unconfigured_engine() -> Engine {
    Engine::new(
        parse_fn(|_| Err(GraphQLError::new(OrchestratorError::EngineNotConfigured(Phase::Parse).to_string()))),
        validate_fn(|_| {
            vec![GraphQLError::new(
                OrchestratorError::EngineNotConfigured(Phase::Validate).to_string(),
            )]
        }),
        execute_fn(|_| unconfigured(Phase::Execute)),
        execute_fn(|_| unconfigured(Phase::Subscribe)),
    )
}

async fn unconfigured(phase: Phase) -> Result<ExecutionOutput, BoxError> {
    Err(OrchestratorError::EngineNotConfigured(phase).into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ─────────────────────────────────────────────────────────────────────────────

struct State {
    plugins: Arc<[Arc<dyn Plugin>]>,
    schema: Arc<SchemaManager>,
    engine: Engine,
    instrumentation: ResolverInstrumentation,
}

/// The initialized plugin pipeline. Cheap to clone and shareable across
/// tasks.
#[derive(Clone)]
pub struct Orchestrator {
    state: Arc<State>,
}

impl Orchestrator {
    /// Starts building an orchestrator.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Builds an orchestrator from `plugins` with no default engine.
    #[must_use]
    pub fn new(plugins: impl Plugins) -> Self {
        Self::builder().add_plugins(plugins).build()
    }

    /// The final plugin list, including plugins added during init.
    #[must_use]
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.state.plugins
    }

    /// The current schema.
    #[must_use]
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.state.schema.current()
    }

    /// Replaces the schema and notifies every plugin.
    pub fn replace_schema(&self, schema: impl Into<Arc<Schema>>) {
        self.state.schema.replace(schema.into(), None);
    }

    /// Returns a handle for replacing the schema from elsewhere.
    #[must_use]
    pub fn schema_handle(&self) -> SchemaHandle {
        SchemaHandle::new(&self.state.schema, None)
    }

    /// Starts a request with `initial_context`.
    ///
    /// Accepts a [`Context`], a JSON object, a [`Map`], or `None` for an
    /// empty context.
    pub fn request(&self, initial_context: impl Into<Context>) -> Request {
        Request {
            state: Arc::clone(&self.state),
            context: initial_context.into(),
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.state.plugins.iter().map(|plugin| plugin.name()).collect();
        f.debug_struct("Orchestrator")
            .field("plugins", &names)
            .field("schema", &self.state.schema)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// A GraphQL request as received over a transport.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLParams {
    /// Source text.
    pub query: String,
    /// Variable values.
    #[serde(default)]
    pub variables: Map,
    /// Operation to run when the document holds several.
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl GraphQLParams {
    /// Creates params for `query` without variables.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the variable values.
    #[must_use]
    pub fn with_variables(mut self, variables: Map) -> Self {
        self.variables = variables;
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

impl From<&str> for GraphQLParams {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for GraphQLParams {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// Phase functions bound to one request context.
///
/// All functions share the context passed to [`Orchestrator::request`].
/// The request holds no other state: phases may be called in any order and
/// any number of times.
pub struct Request {
    state: Arc<State>,
    context: Context,
}

impl Request {
    /// The request context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The current schema.
    #[must_use]
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.state.schema.current()
    }

    /// Parses source text. Syntax errors are returned as `Ok(Err(_))`.
    pub async fn parse(&self, params: impl Into<ParseParams>) -> HookResult<ParseResult> {
        phases::parse(
            &self.state.plugins,
            self.context.clone(),
            params.into(),
            Arc::clone(&self.state.engine.parse),
        )
        .instrument(tracing::debug_span!("enveloper.parse"))
        .await
    }

    /// Validates a document. Returns the validation errors, empty when valid.
    pub async fn validate(&self, params: impl Into<ValidateParams>) -> HookResult<Vec<GraphQLError>> {
        phases::validate(
            &self.state.plugins,
            self.context.clone(),
            params.into(),
            Arc::clone(&self.state.engine.validate),
        )
        .instrument(tracing::debug_span!("enveloper.validate"))
        .await
    }

    /// Runs the context-building hooks, merging `extension` first when it
    /// is a JSON object, and returns the request context.
    pub async fn context_factory(&self, extension: Option<Value>) -> HookResult<Context> {
        if let Some(extension) = extension {
            phases::extend(&self.context, extension);
        }
        phases::build_context(&self.state.plugins, self.context.clone())
            .instrument(tracing::debug_span!("enveloper.context"))
            .await
    }

    /// Executes a query or mutation.
    pub async fn execute(&self, args: impl Into<ExecutionArgs>) -> HookResult<ExecutionOutput> {
        let args = args.into();
        let span = tracing::debug_span!("enveloper.execute", operation = args.operation_name.as_deref());
        execute::execute(
            &self.state.plugins,
            &self.state.instrumentation,
            &self.context,
            args,
            Arc::clone(&self.state.engine.execute),
        )
        .instrument(span)
        .await
    }

    /// Starts a subscription.
    pub async fn subscribe(&self, args: impl Into<SubscriptionArgs>) -> HookResult<ExecutionOutput> {
        let args = args.into();
        let span = tracing::debug_span!("enveloper.subscribe", operation = args.operation_name.as_deref());
        subscribe::subscribe(
            &self.state.plugins,
            &self.state.instrumentation,
            &self.context,
            args,
            Arc::clone(&self.state.engine.subscribe),
        )
        .instrument(span)
        .await
    }

    /// Runs parse, validate, context building and then execute or subscribe.
    ///
    /// Syntax errors, validation errors and an unknown operation name are
    /// returned as a single result carrying the errors.
    ///
    /// # Errors
    ///
    /// Fails with [`OrchestratorError::SchemaNotSet`] when no schema is set,
    /// or with the first hook error.
    pub async fn run(&self, params: impl Into<GraphQLParams>) -> HookResult<ExecutionOutput> {
        let GraphQLParams {
            query,
            variables,
            operation_name,
        } = params.into();
        let schema = self.schema().ok_or(OrchestratorError::SchemaNotSet)?;

        let document: Document = match self.parse(query).await? {
            Ok(document) => document,
            Err(error) => return Ok(ExecutionResult::from(error).into()),
        };
        let errors = self.validate((Arc::clone(&schema), document.clone())).await?;
        if !errors.is_empty() {
            return Ok(ExecutionResult::from_errors(errors).into());
        }

        let Some(kind) = document.operation_kind(operation_name.as_deref()) else {
            let error = OrchestratorError::UnknownOperation(operation_name);
            return Ok(ExecutionResult::from(GraphQLError::new(error.to_string())).into());
        };

        let context = self.context_factory(None).await?;
        let args = ExecutionArgs {
            schema,
            document,
            root_value: Value::Null,
            context_value: Some(context),
            variable_values: variables,
            operation_name,
            field_resolver: None,
            subscribe_field_resolver: None,
        };
        match kind {
            OperationKind::Subscription => self.subscribe(args).await,
            OperationKind::Query | OperationKind::Mutation => self.execute(args).await,
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request").field("context", &self.context).finish_non_exhaustive()
    }
}
