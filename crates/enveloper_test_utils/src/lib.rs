//! Reference GraphQL engine for tests.
//!
//! Implements just enough GraphQL to drive the enveloper pipeline end to end:
//!
//! - [`parse`] wraps `async-graphql-parser`
//! - [`validate`] checks root fields exist and runs caller rules
//! - [`execute`] resolves field selections (no fragments, no directives)
//! - [`subscribe`] maps a subscription field's source stream through the
//!   operation's selection set, one result per event
//!
//! [`fixtures`] provides a small schema exercising all of the above.

pub mod fixtures;

use std::sync::Arc;

use async_graphql_parser::types::{Field, OperationDefinition, Selection, SelectionSet};
use async_graphql_value::ConstValue;
use enveloper_types::{
    BoxError, BoxFuture, Context, Document, Engine, ExecutionArgs, ExecutionOutput, ExecutionResult,
    FieldDefinition, GraphQLError, Map, ObjectType, OperationKind, ParseParams, ParseResult, PathSegment,
    ResolveInfo, ResolverParams, ValidateParams, Value, default_field_resolver, execute_fn, parse_fn,
    validate_fn,
};
use futures::StreamExt;

/// Returns the reference engine as a bundle of phase functions.
#[must_use]
pub fn engine() -> Engine {
    Engine::new(parse_fn(parse), validate_fn(validate), execute_fn(execute), execute_fn(subscribe))
}

/// Parses source text into a [`Document`].
///
/// # Errors
///
/// Returns the syntax error as a [`GraphQLError`].
pub fn parse(params: &ParseParams) -> ParseResult {
    async_graphql_parser::parse_query(&params.source)
        .map(Document::new)
        .map_err(|error| GraphQLError::new(format!("Syntax Error: {error}")))
}

/// Shorthand for parsing a source string.
///
/// # Errors
///
/// Returns the syntax error as a [`GraphQLError`].
pub fn parse_document(source: &str) -> ParseResult {
    parse(&ParseParams::new(source))
}

/// Checks that every root field exists and runs the extra rules.
#[must_use]
pub fn validate(params: &ValidateParams) -> Vec<GraphQLError> {
    let mut errors = Vec::new();
    for (_, operation) in params.document.operations() {
        let kind = OperationKind::from(operation.ty);
        let Some(root) = params.schema.root_type(kind) else {
            errors.push(GraphQLError::new(format!(
                "Schema is not configured to execute {kind} operation."
            )));
            continue;
        };
        let mut selected = 0;
        for item in &operation.selection_set.node.items {
            let Selection::Field(field) = &item.node else {
                continue;
            };
            selected += 1;
            let name = field.node.name.node.as_str();
            if !name.starts_with("__") && root.get_field(name).is_none() {
                errors.push(
                    GraphQLError::new(format!("Cannot query field \"{name}\" on type \"{}\".", root.name()))
                        .with_location(field.pos.line, field.pos.column),
                );
            }
        }
        if kind == OperationKind::Subscription && selected != 1 {
            errors.push(GraphQLError::new("Subscription must select only one top level field."));
        }
    }
    for rule in &params.rules {
        errors.extend(rule.check(&params.schema, &params.document));
    }
    errors
}

/// Executes a query or mutation.
///
/// # Errors
///
/// Never fails; problems are reported inside the result.
pub async fn execute(args: ExecutionArgs) -> Result<ExecutionOutput, BoxError> {
    Ok(run_operation(&args, args.root_value.clone()).await.into())
}

/// Starts a subscription.
///
/// # Errors
///
/// Never fails; problems are reported as a single error result. Errors of
/// the source stream surface as stream items.
pub async fn subscribe(args: ExecutionArgs) -> Result<ExecutionOutput, BoxError> {
    let source = {
        let (operation, root) = match select(&args) {
            Ok(selected) => selected,
            Err(error) => return Ok(ExecutionResult::from(error).into()),
        };
        if OperationKind::from(operation.ty) != OperationKind::Subscription {
            return Ok(ExecutionResult::from(GraphQLError::new("Operation is not a subscription.")).into());
        }
        let Some(field) = operation.selection_set.node.items.iter().find_map(|item| match &item.node {
            Selection::Field(field) => Some(&field.node),
            _ => None,
        }) else {
            return Ok(ExecutionResult::from(GraphQLError::new("Subscription selects no field.")).into());
        };
        let name = field.name.node.as_str();
        let Some(definition) = root.get_field(name) else {
            return Ok(ExecutionResult::from(GraphQLError::new(format!(
                "The subscription field \"{name}\" is not defined."
            )))
            .into());
        };
        let Some(subscriber) = definition.subscriber().or(args.subscribe_field_resolver.as_ref()).cloned()
        else {
            return Ok(ExecutionResult::from(GraphQLError::new(format!(
                "Subscription field \"{name}\" has no source stream."
            )))
            .into());
        };
        let path = vec![PathSegment::Key(response_key(field).to_owned())];
        let arguments = match coerce_arguments(field, &args.variable_values) {
            Ok(arguments) => arguments,
            Err(error) => return Ok(ExecutionResult::from(error.with_path(path)).into()),
        };
        let params = ResolverParams {
            root: args.root_value.clone(),
            args: arguments,
            context: args.context(),
            info: resolve_info(&args, root, definition, path),
        };
        match subscriber(params).await {
            Ok(source) => source,
            Err(error) => return Ok(ExecutionResult::from(error).into()),
        }
    };

    let args = Arc::new(args);
    let results = source.then(move |event| {
        let args = Arc::clone(&args);
        async move {
            match event {
                Ok(event) => Ok(run_operation(&args, event).await),
                Err(error) => Err(Box::new(error) as BoxError),
            }
        }
    });
    Ok(ExecutionOutput::Stream(results.boxed()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

struct Scope<'a> {
    args: &'a ExecutionArgs,
    context: Context,
}

type Completed = (Value, Vec<GraphQLError>);

fn select(args: &ExecutionArgs) -> Result<(&OperationDefinition, &ObjectType), GraphQLError> {
    let operation = args
        .document
        .operation(args.operation_name.as_deref())
        .ok_or_else(|| match &args.operation_name {
            Some(name) => GraphQLError::new(format!("Unknown operation named \"{name}\".")),
            None => GraphQLError::new("Must provide operation name if query contains multiple operations."),
        })?;
    let kind = OperationKind::from(operation.ty);
    let root = args
        .schema
        .root_type(kind)
        .ok_or_else(|| GraphQLError::new(format!("Schema is not configured to execute {kind} operation.")))?;
    Ok((operation, root))
}

async fn run_operation(args: &ExecutionArgs, root_value: Value) -> ExecutionResult {
    let (operation, root) = match select(args) {
        Ok(selected) => selected,
        Err(error) => return error.into(),
    };
    let scope = Scope {
        args,
        context: args.context(),
    };
    let (data, errors) =
        resolve_selection_set(&scope, root, &operation.selection_set.node, root_value, Vec::new()).await;
    ExecutionResult {
        data: Some(data),
        errors,
        extensions: None,
    }
}

fn resolve_selection_set<'a>(
    scope: &'a Scope<'a>,
    object: &'a ObjectType,
    selection_set: &'a SelectionSet,
    parent: Value,
    path: Vec<PathSegment>,
) -> BoxFuture<'a, Completed> {
    Box::pin(async move {
        let mut data = Map::new();
        let mut errors = Vec::new();
        for item in &selection_set.items {
            let Selection::Field(field) = &item.node else {
                continue;
            };
            let field = &field.node;
            let name = field.name.node.as_str();
            let key = response_key(field).to_owned();
            if name == "__typename" {
                data.insert(key, Value::String(object.name().to_owned()));
                continue;
            }
            let mut field_path = path.clone();
            field_path.push(PathSegment::Key(key.clone()));
            let Some(definition) = object.get_field(name) else {
                errors.push(
                    GraphQLError::new(format!("Cannot query field \"{name}\" on type \"{}\".", object.name()))
                        .with_path(field_path),
                );
                data.insert(key, Value::Null);
                continue;
            };
            let (value, field_errors) =
                resolve_field(scope, object, definition, field, parent.clone(), field_path).await;
            data.insert(key, value);
            errors.extend(field_errors);
        }
        (Value::Object(data), errors)
    })
}

async fn resolve_field<'a>(
    scope: &'a Scope<'a>,
    object: &'a ObjectType,
    definition: &'a FieldDefinition,
    field: &'a Field,
    parent: Value,
    path: Vec<PathSegment>,
) -> Completed {
    let arguments = match coerce_arguments(field, &scope.args.variable_values) {
        Ok(arguments) => arguments,
        Err(error) => return (Value::Null, vec![error.with_path(path)]),
    };
    let resolve = definition
        .resolver()
        .or(scope.args.field_resolver.as_ref())
        .cloned()
        .unwrap_or_else(default_field_resolver);
    let params = ResolverParams {
        root: parent,
        args: arguments,
        context: scope.context.clone(),
        info: resolve_info(scope.args, object, definition, path.clone()),
    };
    match resolve(params).await {
        Ok(value) => complete_value(scope, definition, &field.selection_set.node, value, path).await,
        Err(error) if error.path.is_empty() => (Value::Null, vec![error.with_path(path)]),
        Err(error) => (Value::Null, vec![error]),
    }
}

fn complete_value<'a>(
    scope: &'a Scope<'a>,
    definition: &'a FieldDefinition,
    selection_set: &'a SelectionSet,
    value: Value,
    path: Vec<PathSegment>,
) -> BoxFuture<'a, Completed> {
    Box::pin(async move {
        let child = definition.type_name().and_then(|name| scope.args.schema.object(name));
        match (child, value) {
            (Some(_), Value::Array(items)) => {
                let mut completed = Vec::with_capacity(items.len());
                let mut errors = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    let mut item_path = path.clone();
                    item_path.push(PathSegment::Index(index));
                    let (value, item_errors) =
                        complete_value(scope, definition, selection_set, item, item_path).await;
                    completed.push(value);
                    errors.extend(item_errors);
                }
                (Value::Array(completed), errors)
            }
            (Some(child), value) if !value.is_null() && !selection_set.items.is_empty() => {
                resolve_selection_set(scope, child, selection_set, value, path).await
            }
            (_, value) => (value, Vec::new()),
        }
    })
}

fn response_key(field: &Field) -> &str {
    field.alias.as_ref().unwrap_or(&field.name).node.as_str()
}

fn resolve_info(
    args: &ExecutionArgs,
    object: &ObjectType,
    definition: &FieldDefinition,
    path: Vec<PathSegment>,
) -> ResolveInfo {
    ResolveInfo {
        parent_type: object.name().to_owned(),
        field_name: definition.name().to_owned(),
        return_type: definition.type_name().map(str::to_owned),
        path,
        operation_name: args.operation_name.clone(),
    }
}

fn coerce_arguments(field: &Field, variables: &Map) -> Result<Map, GraphQLError> {
    let mut arguments = Map::new();
    for (name, value) in &field.arguments {
        let constant = value
            .node
            .clone()
            .into_const_with(|variable| {
                variables
                    .get(variable.as_str())
                    .cloned()
                    .map_or(Ok(ConstValue::Null), ConstValue::from_json)
            })
            .map_err(|error| GraphQLError::new(format!("Invalid variable: {error}")))?;
        let json = constant
            .into_json()
            .map_err(|error| GraphQLError::new(format!("Invalid argument \"{}\": {error}", name.node.as_str())))?;
        arguments.insert(name.node.as_str().to_owned(), json);
    }
    Ok(arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(source: &str) -> ExecutionArgs {
        ExecutionArgs::new(fixtures::schema(), parse_document(source).unwrap())
    }

    #[tokio::test]
    async fn executes_nested_selections_with_arguments() {
        let result = execute(args(r#"{ hello greet(name: "ada") user(id: 7) { id name } }"#))
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(
            result.data,
            Some(json!({
                "hello": "world",
                "greet": "Hello, ada!",
                "user": { "id": 7, "name": "user-7" }
            }))
        );
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn resolver_errors_carry_path_and_null_the_field() {
        let result = execute(args("{ hello fail }")).await.unwrap().into_single().unwrap();
        assert_eq!(result.data, Some(json!({ "hello": "world", "fail": null })));
        assert_eq!(result.errors[0].path, vec![PathSegment::from("fail")]);
    }

    #[tokio::test]
    async fn variables_are_substituted() {
        let variables = json!({ "who": "grace" }).as_object().cloned().unwrap();
        let result = execute(args("query Q($who: String) { greet(name: $who) }").with_variables(variables))
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(result.data, Some(json!({ "greet": "Hello, grace!" })));
    }

    #[tokio::test]
    async fn subscription_maps_each_event() {
        let stream = subscribe(args("subscription { countdown(from: 2) }"))
            .await
            .unwrap()
            .into_stream()
            .unwrap();
        let items: Vec<_> = stream.map(|item| item.unwrap().data.unwrap()).collect().await;
        assert_eq!(
            items,
            vec![json!({ "countdown": 2 }), json!({ "countdown": 1 }), json!({ "countdown": 0 })]
        );
    }

    #[test]
    fn validate_reports_unknown_root_fields() {
        let schema = fixtures::schema();
        let document = parse_document("{ hello nope }").unwrap();
        let errors = validate(&ValidateParams::from((schema, document)));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("nope"));
    }

    #[test]
    fn parse_errors_are_values() {
        let error = parse_document("{ hello ").unwrap_err();
        assert!(error.message.starts_with("Syntax Error"));
    }
}
