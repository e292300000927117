//! Parsed executable documents.

use core::fmt;
use std::sync::Arc;

use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Selection,
};

/// The kind of a GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A `query` operation.
    Query,
    /// A `mutation` operation.
    Mutation,
    /// A `subscription` operation.
    Subscription,
}

impl From<OperationType> for OperationKind {
    fn from(ty: OperationType) -> Self {
        match ty {
            OperationType::Query => Self::Query,
            OperationType::Mutation => Self::Mutation,
            OperationType::Subscription => Self::Subscription,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

/// A parsed GraphQL executable document.
///
/// Cloning is cheap; the syntax tree is shared.
#[derive(Clone)]
pub struct Document {
    ast: Arc<ExecutableDocument>,
}

impl Document {
    /// Wraps a syntax tree produced by a parser.
    #[must_use]
    pub fn new(ast: ExecutableDocument) -> Self {
        Self { ast: Arc::new(ast) }
    }

    /// Returns the underlying syntax tree.
    #[must_use]
    pub fn ast(&self) -> &ExecutableDocument {
        &self.ast
    }

    /// Returns every operation together with its name.
    #[must_use]
    pub fn operations(&self) -> Vec<(Option<&str>, &OperationDefinition)> {
        match &self.ast.operations {
            DocumentOperations::Single(operation) => vec![(None, &operation.node)],
            DocumentOperations::Multiple(operations) => operations
                .iter()
                .map(|(name, operation)| (Some(name.as_str()), &operation.node))
                .collect(),
        }
    }

    /// Selects the operation to run.
    ///
    /// Without a name the document must contain exactly one operation.
    #[must_use]
    pub fn operation(&self, name: Option<&str>) -> Option<&OperationDefinition> {
        let operations = self.operations();
        match name {
            Some(name) => operations
                .into_iter()
                .find(|(candidate, _)| *candidate == Some(name))
                .map(|(_, operation)| operation),
            None if operations.len() == 1 => operations.into_iter().next().map(|(_, op)| op),
            None => None,
        }
    }

    /// Returns the kind of the selected operation.
    #[must_use]
    pub fn operation_kind(&self, name: Option<&str>) -> Option<OperationKind> {
        self.operation(name).map(|operation| operation.ty.into())
    }

    /// Returns the names of the top-level fields of the selected operation.
    #[must_use]
    pub fn root_fields(&self, name: Option<&str>) -> Vec<&str> {
        self.operation(name)
            .map(|operation| {
                operation
                    .selection_set
                    .node
                    .items
                    .iter()
                    .filter_map(|item| match &item.node {
                        Selection::Field(field) => Some(field.node.name.node.as_str()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` when the selected operation only queries introspection
    /// fields (`__schema`, `__type`, `__typename`).
    #[must_use]
    pub fn is_introspection(&self, name: Option<&str>) -> bool {
        let fields = self.root_fields(name);
        !fields.is_empty() && fields.iter().all(|field| field.starts_with("__"))
    }
}

impl From<ExecutableDocument> for Document {
    fn from(ast: ExecutableDocument) -> Self {
        Self::new(ast)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.operations().into_iter().map(|(name, _)| name).collect();
        f.debug_struct("Document").field("operations", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Document {
        Document::new(async_graphql_parser::parse_query(source).unwrap())
    }

    #[test]
    fn selects_single_anonymous_operation() {
        let doc = parse("{ hello }");
        assert_eq!(doc.operation_kind(None), Some(OperationKind::Query));
        assert!(doc.operation(Some("Other")).is_none());
    }

    #[test]
    fn selects_named_operation() {
        let doc = parse("query A { a } subscription B { b }");
        assert_eq!(doc.operation_kind(Some("B")), Some(OperationKind::Subscription));
        assert_eq!(doc.operation_kind(Some("A")), Some(OperationKind::Query));
        assert!(doc.operation(None).is_none());
    }

    #[test]
    fn lists_root_fields() {
        assert_eq!(parse("{ a b: c ...F } fragment F on Query { d }").root_fields(None), ["a", "c"]);
    }

    #[test]
    fn detects_introspection() {
        assert!(parse("{ __schema { types { name } } }").is_introspection(None));
        assert!(!parse("{ __typename user }").is_introspection(None));
    }
}
