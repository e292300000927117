//! Engine seams.
//!
//! A concrete GraphQL engine plugs into the pipeline through four functions.
//! Plugins may swap any of them per request; the last writer wins.

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use crate::{BoxError, BoxFuture, Document, ExecutionArgs, ExecutionOutput, GraphQLError, ParseParams, ValidateParams};

/// Outcome of parsing. Syntax errors are data, not failures of the phase.
pub type ParseResult = Result<Document, GraphQLError>;

/// Parses source text into a document.
pub type ParseFn = Arc<dyn Fn(&ParseParams) -> ParseResult + Send + Sync>;

/// Validates a document, returning the list of errors (empty when valid).
pub type ValidateFn = Arc<dyn Fn(&ValidateParams) -> Vec<GraphQLError> + Send + Sync>;

/// Executes an operation.
pub type ExecuteFn =
    Arc<dyn Fn(ExecutionArgs) -> BoxFuture<'static, Result<ExecutionOutput, BoxError>> + Send + Sync>;

/// Creates the result stream of a subscription.
pub type SubscribeFn = ExecuteFn;

/// Wraps a closure as a [`ParseFn`].
pub fn parse_fn<F>(f: F) -> ParseFn
where
    F: Fn(&ParseParams) -> ParseResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`ValidateFn`].
pub fn validate_fn<F>(f: F) -> ValidateFn
where
    F: Fn(&ValidateParams) -> Vec<GraphQLError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps an async closure as an [`ExecuteFn`] or [`SubscribeFn`].
pub fn execute_fn<F, Fut>(f: F) -> ExecuteFn
where
    F: Fn(ExecutionArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ExecutionOutput, BoxError>> + Send + 'static,
{
    Arc::new(move |args| -> BoxFuture<'static, Result<ExecutionOutput, BoxError>> { Box::pin(f(args)) })
}

/// The four phase functions of a GraphQL engine.
#[derive(Clone)]
pub struct Engine {
    /// Parser.
    pub parse: ParseFn,
    /// Validator.
    pub validate: ValidateFn,
    /// Executor.
    pub execute: ExecuteFn,
    /// Subscription source.
    pub subscribe: SubscribeFn,
}

impl Engine {
    /// Bundles four phase functions.
    #[must_use]
    pub fn new(parse: ParseFn, validate: ValidateFn, execute: ExecuteFn, subscribe: SubscribeFn) -> Self {
        Self {
            parse,
            validate,
            execute,
            subscribe,
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
