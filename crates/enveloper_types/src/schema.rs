//! Executable schema model.
//!
//! A [`Schema`] is an immutable set of object types whose fields carry
//! optional resolvers. Engines walk it to execute documents; the core only
//! swaps whole schema instances and, when resolver instrumentation is
//! requested, rebuilds one with every resolver wrapped.
//!
//! # Example
//!
//! ```
//! use enveloper_types::{FieldDefinition, ObjectType, Schema, resolver};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .object(
//!         ObjectType::new("Query")
//!             .field(FieldDefinition::new("hello").resolve(resolver(|_| async { Ok(json!("world")) }))),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert!(schema.field("Query", "hello").is_some());
//! ```

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::{BoxFuture, BoxStream, Context, GraphQLError, Map, OperationKind, PathSegment, SchemaError, Value};

/// Result of resolving one field.
pub type FieldResult = Result<Value, GraphQLError>;

/// Source event stream of a subscription field.
pub type FieldStream = BoxStream<'static, FieldResult>;

/// A field resolver.
pub type Resolver = Arc<dyn Fn(ResolverParams) -> BoxFuture<'static, FieldResult> + Send + Sync>;

/// A subscription field resolver producing the source event stream.
pub type SubscribeResolver =
    Arc<dyn Fn(ResolverParams) -> BoxFuture<'static, Result<FieldStream, GraphQLError>> + Send + Sync>;

/// Wraps an async closure as a [`Resolver`].
pub fn resolver<F, Fut>(f: F) -> Resolver
where
    F: Fn(ResolverParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FieldResult> + Send + 'static,
{
    Arc::new(move |params| -> BoxFuture<'static, FieldResult> { Box::pin(f(params)) })
}

/// Wraps an async closure as a [`SubscribeResolver`].
pub fn subscribe_resolver<F, Fut>(f: F) -> SubscribeResolver
where
    F: Fn(ResolverParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FieldStream, GraphQLError>> + Send + 'static,
{
    Arc::new(move |params| -> BoxFuture<'static, Result<FieldStream, GraphQLError>> { Box::pin(f(params)) })
}

/// The resolver used for fields without one: reads the property named after
/// the field from the parent object, or `null`.
#[must_use]
pub fn default_field_resolver() -> Resolver {
    resolver(|params: ResolverParams| async move {
        Ok(params
            .root
            .get(params.info.field_name.as_str())
            .cloned()
            .unwrap_or(Value::Null))
    })
}

/// Inputs handed to a resolver.
#[derive(Debug, Clone)]
pub struct ResolverParams {
    /// The parent value.
    pub root: Value,
    /// Coerced field arguments.
    pub args: Map,
    /// The request context.
    pub context: Context,
    /// Position of the field in the operation.
    pub info: ResolveInfo,
}

/// Describes the field being resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveInfo {
    /// Type owning the field.
    pub parent_type: String,
    /// Field name.
    pub field_name: String,
    /// Named object type of the field, if any.
    pub return_type: Option<String>,
    /// Response path of the field.
    pub path: Vec<PathSegment>,
    /// Name of the running operation.
    pub operation_name: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// FieldDefinition / ObjectType
// ─────────────────────────────────────────────────────────────────────────────

/// A field of an object type.
#[derive(Clone)]
pub struct FieldDefinition {
    name: String,
    type_name: Option<String>,
    resolve: Option<Resolver>,
    subscribe: Option<SubscribeResolver>,
}

impl FieldDefinition {
    /// Creates a scalar field without a resolver.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            resolve: None,
            subscribe: None,
        }
    }

    /// Declares the object type the field returns, enabling sub-selections.
    #[must_use]
    pub fn of_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Sets the field resolver.
    #[must_use]
    pub fn resolve(mut self, resolver: Resolver) -> Self {
        self.resolve = Some(resolver);
        self
    }

    /// Sets the subscription source resolver.
    #[must_use]
    pub fn subscribe(mut self, resolver: SubscribeResolver) -> Self {
        self.subscribe = Some(resolver);
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared object type.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Field resolver.
    #[must_use]
    pub fn resolver(&self) -> Option<&Resolver> {
        self.resolve.as_ref()
    }

    /// Subscription source resolver.
    #[must_use]
    pub fn subscriber(&self) -> Option<&SubscribeResolver> {
        self.subscribe.as_ref()
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("resolve", &self.resolve.is_some())
            .field("subscribe", &self.subscribe.is_some())
            .finish()
    }
}

/// An object type.
#[derive(Debug, Clone)]
pub struct ObjectType {
    name: String,
    fields: IndexMap<String, FieldDefinition>,
}

impl ObjectType {
    /// Creates an object type with no fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field, replacing any field with the same name.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a field.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }

    /// Iterates fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

/// An immutable executable schema.
#[derive(Debug, Clone)]
pub struct Schema {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
    types: IndexMap<String, ObjectType>,
    instrumented: bool,
}

impl Schema {
    /// Starts building a schema whose query root is `Query`.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Name of the query root type.
    #[must_use]
    pub fn query_type(&self) -> &str {
        &self.query
    }

    /// Name of the mutation root type.
    #[must_use]
    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation.as_deref()
    }

    /// Name of the subscription root type.
    #[must_use]
    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    /// Returns the root type for an operation kind.
    #[must_use]
    pub fn root_type(&self, kind: OperationKind) -> Option<&ObjectType> {
        let name = match kind {
            OperationKind::Query => Some(self.query.as_str()),
            OperationKind::Mutation => self.mutation.as_deref(),
            OperationKind::Subscription => self.subscription.as_deref(),
        }?;
        self.types.get(name)
    }

    /// Looks up an object type.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    /// Looks up a field of an object type.
    #[must_use]
    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldDefinition> {
        self.object(type_name)?.get_field(field)
    }

    /// Iterates object types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    /// Returns `true` if this schema was produced by
    /// [`instrument_resolvers`](Self::instrument_resolvers).
    #[must_use]
    pub fn is_instrumented(&self) -> bool {
        self.instrumented
    }

    /// Returns a copy of the schema with every field resolver replaced by
    /// `wrap(type, field, resolver)`. Fields without a resolver pass the
    /// [`default_field_resolver`].
    #[must_use]
    pub fn instrument_resolvers(
        &self,
        mut wrap: impl FnMut(&ObjectType, &FieldDefinition, Resolver) -> Resolver,
    ) -> Self {
        let mut instrumented = self.clone();
        for (name, object) in &mut instrumented.types {
            let Some(original) = self.types.get(name) else {
                continue;
            };
            for (field_name, field) in &mut object.fields {
                let Some(source) = original.fields.get(field_name) else {
                    continue;
                };
                let inner = source.resolve.clone().unwrap_or_else(default_field_resolver);
                field.resolve = Some(wrap(original, source, inner));
            }
        }
        instrumented.instrumented = true;
        instrumented
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    query: String,
    mutation: Option<String>,
    subscription: Option<String>,
    types: IndexMap<String, ObjectType>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self {
            query: "Query".to_owned(),
            mutation: None,
            subscription: None,
            types: IndexMap::new(),
        }
    }
}

impl SchemaBuilder {
    /// Sets the query root type name.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>) -> Self {
        self.query = name.into();
        self
    }

    /// Sets the mutation root type name.
    #[must_use]
    pub fn mutation(mut self, name: impl Into<String>) -> Self {
        self.mutation = Some(name.into());
        self
    }

    /// Sets the subscription root type name.
    #[must_use]
    pub fn subscription(mut self, name: impl Into<String>) -> Self {
        self.subscription = Some(name.into());
        self
    }

    /// Adds an object type.
    #[must_use]
    pub fn object(mut self, object: ObjectType) -> Self {
        self.types.insert(object.name.clone(), object);
        self
    }

    /// Checks type references and builds the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when a root type or a field's object type is
    /// not defined.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let roots = core::iter::once(&self.query)
            .chain(self.mutation.iter())
            .chain(self.subscription.iter());
        for root in roots {
            if !self.types.contains_key(root) {
                return Err(SchemaError::MissingRootType(root.clone()));
            }
        }
        for object in self.types.values() {
            for field in object.fields.values() {
                if let Some(target) = &field.type_name
                    && !self.types.contains_key(target)
                {
                    return Err(SchemaError::UnknownFieldType {
                        type_name: object.name.clone(),
                        field: field.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(Schema {
            query: self.query,
            mutation: self.mutation,
            subscription: self.subscription,
            types: self.types,
            instrumented: false,
        })
    }
}
