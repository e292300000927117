//! GraphQL data model shared by the enveloper crates.
//!
//! This crate holds everything that crosses the boundary between the
//! orchestration core and a concrete GraphQL engine:
//!
//! - [`Context`]: the per-request key/value context with stable identity
//! - [`Schema`]: object types, fields and their resolvers
//! - [`Document`]: a parsed executable document
//! - [`ExecutionArgs`], [`ParseParams`], [`ValidateParams`]: phase inputs
//! - [`ExecutionResult`] and [`ExecutionOutput`]: phase outputs
//! - [`Engine`]: the four swappable phase functions
//!
//! The core never interprets GraphQL itself. It only moves these values
//! between plugins and whichever engine has been installed.

mod args;
mod context;
mod document;
mod engine;
mod error;
mod result;
mod schema;

pub use args::{ExecutionArgs, ParseOptions, ParseParams, SubscriptionArgs, ValidateParams, ValidationRule};
pub use context::Context;
pub use document::{Document, OperationKind};
pub use engine::{Engine, ExecuteFn, ParseFn, ParseResult, SubscribeFn, ValidateFn, execute_fn, parse_fn, validate_fn};
pub use error::{BoxError, GraphQLError, Location, PathSegment, SchemaError};
pub use result::{ExecutionOutput, ExecutionResult, ResultStream};
pub use schema::{
    FieldDefinition, FieldResult, FieldStream, ObjectType, ResolveInfo, Resolver, ResolverParams, Schema,
    SchemaBuilder, SubscribeResolver, default_field_resolver, resolver, subscribe_resolver,
};

/// JSON value used for data, variables and context entries.
pub type Value = serde_json::Value;

/// JSON object.
pub type Map = serde_json::Map<String, Value>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// A boxed, sendable stream.
pub type BoxStream<'a, T> = futures::stream::BoxStream<'a, T>;
