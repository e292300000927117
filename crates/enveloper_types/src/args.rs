//! Phase inputs.
//!
//! Every phase accepts either its argument struct or the positional tuple
//! form older call sites use. Both normalize to the same struct before any
//! plugin sees them.

use core::fmt;
use std::sync::Arc;

use crate::{Context, Document, GraphQLError, Map, Resolver, Schema, SubscribeResolver, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Parse
// ─────────────────────────────────────────────────────────────────────────────

/// Parser options forwarded to the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Omit source locations from the syntax tree.
    pub no_location: bool,
    /// Upper bound on the number of tokens the parser may read.
    pub max_tokens: Option<usize>,
}

/// Input of the parse phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseParams {
    /// GraphQL source text.
    pub source: String,
    /// Parser options.
    pub options: ParseOptions,
}

impl ParseParams {
    /// Creates parse params with default options.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            options: ParseOptions::default(),
        }
    }
}

impl From<&str> for ParseParams {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for ParseParams {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl<S: Into<String>> From<(S, ParseOptions)> for ParseParams {
    fn from((source, options): (S, ParseOptions)) -> Self {
        Self {
            source: source.into(),
            options,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validate
// ─────────────────────────────────────────────────────────────────────────────

/// An additional validation rule run on top of the engine's built-in rules.
#[derive(Clone)]
pub struct ValidationRule {
    name: Arc<str>,
    check: Arc<dyn Fn(&Schema, &Document) -> Vec<GraphQLError> + Send + Sync>,
}

impl ValidationRule {
    /// Creates a named rule.
    pub fn new<F>(name: impl Into<Arc<str>>, check: F) -> Self
    where
        F: Fn(&Schema, &Document) -> Vec<GraphQLError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the rule.
    #[must_use]
    pub fn check(&self, schema: &Schema, document: &Document) -> Vec<GraphQLError> {
        (self.check)(schema, document)
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ValidationRule").field(&self.name).finish()
    }
}

/// Input of the validate phase.
#[derive(Debug, Clone)]
pub struct ValidateParams {
    /// Schema to validate against.
    pub schema: Arc<Schema>,
    /// Document to validate.
    pub document: Document,
    /// Extra rules supplied by the caller.
    pub rules: Vec<ValidationRule>,
}

impl From<(Arc<Schema>, Document)> for ValidateParams {
    fn from((schema, document): (Arc<Schema>, Document)) -> Self {
        Self {
            schema,
            document,
            rules: Vec::new(),
        }
    }
}

impl From<(Arc<Schema>, Document, Vec<ValidationRule>)> for ValidateParams {
    fn from((schema, document, rules): (Arc<Schema>, Document, Vec<ValidationRule>)) -> Self {
        Self { schema, document, rules }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execute / Subscribe
// ─────────────────────────────────────────────────────────────────────────────

/// Input of the execute and subscribe phases.
#[derive(Clone)]
pub struct ExecutionArgs {
    /// Schema to execute against.
    pub schema: Arc<Schema>,
    /// Parsed and validated document.
    pub document: Document,
    /// Value passed as the parent of root fields.
    pub root_value: Value,
    /// Request context. Filled with the request's context when left empty.
    pub context_value: Option<Context>,
    /// Variable values.
    pub variable_values: Map,
    /// Operation to run when the document holds several.
    pub operation_name: Option<String>,
    /// Resolver used for fields that do not declare one.
    pub field_resolver: Option<Resolver>,
    /// Source resolver used for subscription fields that do not declare one.
    pub subscribe_field_resolver: Option<SubscribeResolver>,
}

/// Subscriptions take the same arguments as executions.
pub type SubscriptionArgs = ExecutionArgs;

impl ExecutionArgs {
    /// Creates arguments with a `null` root, no variables and no context.
    #[must_use]
    pub fn new(schema: Arc<Schema>, document: Document) -> Self {
        Self {
            schema,
            document,
            root_value: Value::Null,
            context_value: None,
            variable_values: Map::new(),
            operation_name: None,
            field_resolver: None,
            subscribe_field_resolver: None,
        }
    }

    /// Sets the root value.
    #[must_use]
    pub fn with_root_value(mut self, root_value: Value) -> Self {
        self.root_value = root_value;
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context_value = Some(context);
        self
    }

    /// Sets the variable values.
    #[must_use]
    pub fn with_variables(mut self, variables: Map) -> Self {
        self.variable_values = variables;
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Sets the fallback field resolver.
    #[must_use]
    pub fn with_field_resolver(mut self, resolver: Resolver) -> Self {
        self.field_resolver = Some(resolver);
        self
    }

    /// Sets the fallback subscription source resolver.
    #[must_use]
    pub fn with_subscribe_field_resolver(mut self, resolver: SubscribeResolver) -> Self {
        self.subscribe_field_resolver = Some(resolver);
        self
    }

    /// Returns the context, or a fresh one when none was given.
    #[must_use]
    pub fn context(&self) -> Context {
        self.context_value.clone().unwrap_or_default()
    }
}

impl From<(Arc<Schema>, Document)> for ExecutionArgs {
    fn from((schema, document): (Arc<Schema>, Document)) -> Self {
        Self::new(schema, document)
    }
}

/// Positional form: schema, document, root value, context, variables, operation name.
impl From<(Arc<Schema>, Document, Value, Option<Context>, Map, Option<String>)> for ExecutionArgs {
    fn from(
        (schema, document, root_value, context_value, variable_values, operation_name): (
            Arc<Schema>,
            Document,
            Value,
            Option<Context>,
            Map,
            Option<String>,
        ),
    ) -> Self {
        Self {
            root_value,
            context_value,
            variable_values,
            operation_name,
            ..Self::new(schema, document)
        }
    }
}

impl fmt::Debug for ExecutionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionArgs")
            .field("document", &self.document)
            .field("root_value", &self.root_value)
            .field("context_value", &self.context_value)
            .field("variable_values", &self.variable_values)
            .field("operation_name", &self.operation_name)
            .field("field_resolver", &self.field_resolver.is_some())
            .field("subscribe_field_resolver", &self.subscribe_field_resolver.is_some())
            .finish_non_exhaustive()
    }
}
