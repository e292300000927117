//! A small schema covering queries, nested objects, failing fields and
//! subscriptions.
//!
//! ```graphql
//! type Query {
//!   hello: String                # "world"
//!   greet(name: String): String  # "Hello, <name>!"
//!   user(id: Int): User
//!   users: [User]                # ids 1 and 2
//!   fail: String                 # always errors with "boom"
//!   fromContext(key: String): JSON
//! }
//! type User { id: Int, name: String }
//! type Subscription {
//!   countdown(from: Int): Int    # from, from-1, .., 0
//!   alphabet: String             # "a", "b", "c", "d"
//!   faulty(after: Int): Int      # `after` events, then a source error
//! }
//! ```

use std::sync::Arc;

use enveloper_types::{
    FieldDefinition, FieldStream, GraphQLError, ObjectType, ResolverParams, Schema, Value, resolver,
    subscribe_resolver,
};
use futures::{StreamExt, stream};
use serde_json::json;

/// Message of the error raised by the `faulty` subscription source.
pub const SOURCE_FAILURE: &str = "source failed";

/// Builds the fixture schema.
#[must_use]
pub fn schema() -> Arc<Schema> {
    let query = ObjectType::new("Query")
        .field(FieldDefinition::new("hello").resolve(resolver(|_| async { Ok(json!("world")) })))
        .field(FieldDefinition::new("greet").resolve(resolver(|params: ResolverParams| async move {
            let name = params.args.get("name").and_then(Value::as_str).unwrap_or("stranger");
            Ok(json!(format!("Hello, {name}!")))
        })))
        .field(
            FieldDefinition::new("user")
                .of_type("User")
                .resolve(resolver(|params: ResolverParams| async move {
                    let id = params.args.get("id").cloned().unwrap_or(Value::Null);
                    Ok(user(&id))
                })),
        )
        .field(
            FieldDefinition::new("users")
                .of_type("User")
                .resolve(resolver(|_| async { Ok(json!([user(&json!(1)), user(&json!(2))])) })),
        )
        .field(FieldDefinition::new("fail").resolve(resolver(|_| async { Err(GraphQLError::new("boom")) })))
        .field(FieldDefinition::new("fromContext").resolve(resolver(|params: ResolverParams| async move {
            let key = params.args.get("key").and_then(Value::as_str).unwrap_or_default();
            Ok(params.context.get(key).unwrap_or(Value::Null))
        })));

    let user_type = ObjectType::new("User")
        .field(FieldDefinition::new("id"))
        .field(FieldDefinition::new("name"));

    let echo = || resolver(|params: ResolverParams| async move { Ok(params.root) });
    let subscription = ObjectType::new("Subscription")
        .field(
            FieldDefinition::new("countdown")
                .resolve(echo())
                .subscribe(subscribe_resolver(|params: ResolverParams| async move {
                    let from = params.args.get("from").and_then(Value::as_u64).unwrap_or(3);
                    let events: FieldStream = stream::iter((0..=from).rev().map(|n| Ok(json!(n)))).boxed();
                    Ok(events)
                })),
        )
        .field(
            FieldDefinition::new("alphabet")
                .resolve(echo())
                .subscribe(subscribe_resolver(|_| async {
                    let events: FieldStream = stream::iter(["a", "b", "c", "d"].map(|c| Ok(json!(c)))).boxed();
                    Ok(events)
                })),
        )
        .field(
            FieldDefinition::new("faulty")
                .resolve(echo())
                .subscribe(subscribe_resolver(|params: ResolverParams| async move {
                    let after = params.args.get("after").and_then(Value::as_u64).unwrap_or(1);
                    let events: FieldStream = stream::iter((0..after).map(|n| Ok(json!(n))))
                        .chain(stream::once(async { Err(GraphQLError::new(SOURCE_FAILURE)) }))
                        .boxed();
                    Ok(events)
                })),
        );

    let built = Schema::builder()
        .subscription("Subscription")
        .object(query)
        .object(user_type)
        .object(subscription)
        .build();
    match built {
        Ok(schema) => Arc::new(schema),
        Err(error) => unreachable!("fixture schema is well formed: {error}"),
    }
}

fn user(id: &Value) -> Value {
    json!({ "id": id, "name": format!("user-{id}") })
}
