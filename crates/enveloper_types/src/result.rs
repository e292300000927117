//! Execution results.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{BoxError, BoxStream, GraphQLError, Map, Value};

/// A stream of incremental results (subscriptions, deferred payloads).
pub type ResultStream = BoxStream<'static, Result<ExecutionResult, BoxError>>;

/// The response of one GraphQL operation, or of one item of a result stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Result data; `None` when execution did not start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Errors raised while executing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    /// Response extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map>,
}

impl ExecutionResult {
    /// Creates a successful result.
    #[must_use]
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Creates a result that carries only errors.
    #[must_use]
    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }

    /// Returns `true` if the result carries at least one error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Inserts a response extension.
    pub fn insert_extension(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
    }
}

impl From<GraphQLError> for ExecutionResult {
    fn from(error: GraphQLError) -> Self {
        Self::from_errors(vec![error])
    }
}

/// Outcome of an execute or subscribe call: one result or a stream of them.
pub enum ExecutionOutput {
    /// A single response.
    Single(ExecutionResult),
    /// An asynchronous sequence of responses.
    Stream(ResultStream),
}

impl ExecutionOutput {
    /// Returns `true` for stream outputs.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns the single result, if this is not a stream.
    #[must_use]
    pub fn as_single(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Single(result) => Some(result),
            Self::Stream(_) => None,
        }
    }

    /// Consumes the output, returning the single result if present.
    #[must_use]
    pub fn into_single(self) -> Option<ExecutionResult> {
        match self {
            Self::Single(result) => Some(result),
            Self::Stream(_) => None,
        }
    }

    /// Consumes the output, returning the stream if present.
    #[must_use]
    pub fn into_stream(self) -> Option<ResultStream> {
        match self {
            Self::Stream(stream) => Some(stream),
            Self::Single(_) => None,
        }
    }
}

impl From<ExecutionResult> for ExecutionOutput {
    fn from(result: ExecutionResult) -> Self {
        Self::Single(result)
    }
}

impl From<ResultStream> for ExecutionOutput {
    fn from(stream: ResultStream) -> Self {
        Self::Stream(stream)
    }
}

impl fmt::Debug for ExecutionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(result) => f.debug_tuple("Single").field(result).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_graphql_response_shape() {
        let mut result = ExecutionResult::from_data(json!({ "hello": "world" }));
        result.insert_extension("cost", 3);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "data": { "hello": "world" }, "extensions": { "cost": 3 } })
        );
    }

    #[test]
    fn single_output_accessors() {
        let output = ExecutionOutput::from(ExecutionResult::from(GraphQLError::new("nope")));
        assert!(!output.is_stream());
        assert!(output.as_single().is_some_and(ExecutionResult::has_errors));
        assert!(output.into_stream().is_none());
    }
}
