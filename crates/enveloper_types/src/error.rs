//! Error types shared across the pipeline.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::Map;

/// Error type returned by plugin hooks and engine functions.
///
/// Errors raised by plugins travel through the pipeline unchanged, so callers
/// can recover their concrete type with `downcast_ref`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// GraphQLError
// ─────────────────────────────────────────────────────────────────────────────

/// A GraphQL error as it appears in the `errors` list of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct GraphQLError {
    /// Human readable description.
    pub message: String,
    /// Source locations the error refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    /// Response path of the field that failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map>,
}

impl GraphQLError {
    /// Creates an error with the given message and no location or path.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
            extensions: None,
        }
    }

    /// Creates an error carrying the display text of any error value.
    #[must_use]
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        match error.downcast_ref::<GraphQLError>() {
            Some(graphql) => graphql.clone(),
            None => Self::new(error.to_string()),
        }
    }

    /// Sets the response path.
    #[must_use]
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    /// Adds a source location.
    #[must_use]
    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.locations.push(Location { line, column });
        self
    }

    /// Inserts an extension entry.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

impl From<BoxError> for GraphQLError {
    fn from(error: BoxError) -> Self {
        Self::from_error(error.as_ref())
    }
}

/// A line/column position in the request source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// One-based line.
    pub line: usize,
    /// One-based column.
    pub column: usize,
}

/// One segment of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Field response key.
    Key(String),
    /// List index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SchemaError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors produced while assembling a [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A root operation type names an object type that was never added.
    #[error("root type '{0}' is not defined")]
    MissingRootType(String),
    /// A field declares an object type that was never added.
    #[error("field '{type_name}.{field}' refers to unknown type '{target}'")]
    UnknownFieldType {
        /// Type owning the field.
        type_name: String,
        /// Field name.
        field: String,
        /// The missing type.
        target: String,
    },
}
