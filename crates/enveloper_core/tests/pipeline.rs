//! End-to-end behavior of the request pipeline with the reference engine.

mod common;

use std::sync::Arc;

use common::{Extend, Log, ProvideSchema, orchestrator};
use enveloper_core::prelude::*;
use enveloper_core::{GraphQLParams, PluginGroupBuilder, ResolverCall, SchemaHandle};
use enveloper_test_utils::fixtures;
use enveloper_types::{ExecutionResult, GraphQLError, Schema};
use parking_lot::Mutex;
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn context_extensions_from_two_plugins_are_merged() {
    let orchestrator = orchestrator(
        PluginGroupBuilder::new()
            .add(Extend(json!({ "a": 1 })))
            .add(Extend(json!({ "b": 2 }))),
    );
    let request = orchestrator.request(None);
    let context = request.context_factory(None).await.unwrap();
    assert_eq!(serde_json::Value::Object(context.snapshot()), json!({ "a": 1, "b": 2 }));

    let result = request
        .run("{ fromContext(key: \"b\") }")
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(result.data, Some(json!({ "fromContext": 2 })));
}

#[tokio::test]
async fn context_factory_merges_caller_extension_first() {
    let orchestrator = orchestrator(Extend(json!({ "user": "plugin" })));
    let request = orchestrator.request(json!({ "initial": true }));
    let context = request.context_factory(Some(json!({ "user": "caller" }))).await.unwrap();
    assert_eq!(context.get("initial"), Some(json!(true)));
    assert_eq!(context.get("user"), Some(json!("plugin")));
}

struct RejectSession;

#[async_trait]
impl Plugin for RejectSession {
    async fn on_context_building(&self, _hook: &mut OnContextBuilding) -> HookResult<ContextBuildingOutcome> {
        Err(GraphQLError::new("session expired").into())
    }
}

#[tokio::test]
async fn context_building_errors_reject_the_request() {
    let error = orchestrator(RejectSession)
        .request(None)
        .run("{ hello }")
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "session expired");
}

// ─────────────────────────────────────────────────────────────────────────────
// Execute
// ─────────────────────────────────────────────────────────────────────────────

struct Journal {
    name: &'static str,
    log: Log,
}

#[async_trait]
impl Plugin for Journal {
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        self.log.push(format!("{}:execute", self.name));
        let (name, log) = (self.name, self.log.clone());
        Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
            move |done: &mut ExecuteDone| {
                let data = done.result().and_then(|result| result.data.clone()).unwrap_or_default();
                log.push(format!("{name}:done:{data}"));
                Ok(None)
            },
        ))))
    }
}

struct Replace;

#[async_trait]
impl Plugin for Replace {
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
            |done: &mut ExecuteDone| {
                done.set_result(ExecutionResult::from_data(json!({ "replaced": true })));
                Ok(None)
            },
        ))))
    }
}

#[tokio::test]
async fn execute_done_runs_once_per_plugin_in_order() {
    let log = Log::new();
    let orchestrator = orchestrator(
        PluginGroupBuilder::new()
            .add(Journal { name: "a", log: log.clone() })
            .add(Journal { name: "b", log: log.clone() }),
    );
    orchestrator.request(None).run("{ hello }").await.unwrap();
    assert_eq!(
        log.entries(),
        [
            "a:execute",
            "b:execute",
            r#"a:done:{"hello":"world"}"#,
            r#"b:done:{"hello":"world"}"#,
        ]
    );
}

#[tokio::test]
async fn replaced_result_reaches_later_hooks_and_the_caller() {
    let log = Log::new();
    let orchestrator = orchestrator(
        PluginGroupBuilder::new()
            .add(Journal { name: "early", log: log.clone() })
            .add(Replace)
            .add(Journal { name: "late", log: log.clone() }),
    );
    let result = orchestrator
        .request(None)
        .run("{ hello }")
        .await
        .unwrap()
        .into_single()
        .unwrap();

    assert_eq!(result.data, Some(json!({ "replaced": true })));
    let entries = log.entries();
    assert_eq!(entries[2], r#"early:done:{"hello":"world"}"#);
    assert_eq!(entries[3], r#"late:done:{"replaced":true}"#);
}

#[tokio::test]
async fn operation_name_selects_among_several_operations() {
    let result = orchestrator(PluginGroupBuilder::new())
        .request(None)
        .run(GraphQLParams::new("query A { hello } query B { greet(name: \"B\") }").with_operation_name("B"))
        .await
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(result.data, Some(json!({ "greet": "Hello, B!" })));
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin init
// ─────────────────────────────────────────────────────────────────────────────

struct Parent(Log);

impl Plugin for Parent {
    fn name(&self) -> &str {
        "parent"
    }

    fn on_plugin_init(&self, init: &mut PluginInit<'_>) {
        self.0.push("init:parent");
        init.add_plugin(Child(self.0.clone()));
    }
}

struct Child(Log);

#[async_trait]
impl Plugin for Child {
    fn name(&self) -> &str {
        "child"
    }

    fn on_plugin_init(&self, init: &mut PluginInit<'_>) {
        self.0.push(format!("init:child:{}", init.plugins().len()));
    }

    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        self.0.push("child:execute");
        Ok(HookOutcome::Continue)
    }
}

struct Sibling(Log);

impl Plugin for Sibling {
    fn name(&self) -> &str {
        "sibling"
    }

    fn on_plugin_init(&self, _init: &mut PluginInit<'_>) {
        self.0.push("init:sibling");
    }
}

#[tokio::test]
async fn plugins_added_during_init_are_appended_and_initialized() {
    let log = Log::new();
    let orchestrator = orchestrator(
        PluginGroupBuilder::new()
            .add(Parent(log.clone()))
            .add(Sibling(log.clone())),
    );

    let names: Vec<_> = orchestrator.plugins().iter().map(|plugin| plugin.name()).collect();
    assert_eq!(names[1..], ["parent", "sibling", "child"]);
    assert_eq!(log.entries(), ["init:parent", "init:sibling", "init:child:4"]);

    orchestrator.request(None).run("{ hello }").await.unwrap();
    assert_eq!(log.count("child:execute"), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema changes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Reloader {
    handle: Mutex<Option<SchemaHandle>>,
    changes: Mutex<usize>,
}

impl Plugin for Reloader {
    fn on_plugin_init(&self, init: &mut PluginInit<'_>) {
        *self.handle.lock() = Some(init.schema_handle());
    }

    fn on_schema_change(&self, _change: &SchemaChange) {
        *self.changes.lock() += 1;
    }
}

#[derive(Default)]
struct Watcher(Mutex<Vec<Arc<Schema>>>);

impl Plugin for Watcher {
    fn on_schema_change(&self, change: &SchemaChange) {
        self.0.lock().push(Arc::clone(change.schema()));
    }
}

#[tokio::test]
async fn schema_replaced_through_a_handle_notifies_everyone_else() {
    let reloader = Arc::new(Reloader::default());
    let watcher = Arc::new(Watcher::default());
    let orchestrator = Orchestrator::builder()
        .add_plugins(ProvideSchema)
        .add_plugins(Arc::clone(&reloader) as Arc<dyn Plugin>)
        .add_plugins(Arc::clone(&watcher) as Arc<dyn Plugin>)
        .build();
    assert_eq!(watcher.0.lock().len(), 1);
    let changes_after_init = *reloader.changes.lock();

    let next = fixtures::schema();
    let handle = reloader.handle.lock().clone().unwrap();
    handle.replace_schema(Arc::clone(&next));

    assert!(Arc::ptr_eq(&orchestrator.schema().unwrap(), &next));
    assert_eq!(watcher.0.lock().len(), 2);
    assert!(Arc::ptr_eq(&watcher.0.lock()[1], &next));
    assert_eq!(*reloader.changes.lock(), changes_after_init);
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver instrumentation
// ─────────────────────────────────────────────────────────────────────────────

struct FieldTracer(Log);

#[async_trait]
impl Plugin for FieldTracer {
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        let log = self.0.clone();
        Ok(HookOutcome::After(ExecuteHooks::new().on_resolver_called(ResolverHook::new(
            move |call: &mut ResolverCall| {
                let field = format!("{}.{}", call.info().parent_type, call.info().field_name);
                log.push(field.clone());
                let log = log.clone();
                Ok(HookOutcome::After(ResolverAfter::new(move |done| {
                    match done.result() {
                        Ok(_) => log.push(format!("{field}:ok")),
                        Err(error) => log.push(format!("{field}:err:{}", error.message)),
                    }
                    if field == "Query.hello" {
                        done.set_result(Ok(json!("intercepted")));
                    }
                })))
            },
        ))))
    }
}

#[tokio::test]
async fn resolver_hooks_wrap_every_field() {
    let log = Log::new();
    let result = orchestrator(FieldTracer(log.clone()))
        .request(None)
        .run("{ hello user(id: 1) { name } fail }")
        .await
        .unwrap()
        .into_single()
        .unwrap();

    let data = result.data.unwrap();
    assert_eq!(data["hello"], json!("intercepted"));
    assert!(data["user"]["name"].is_string());
    assert_eq!(result.errors[0].message, "boom");

    let entries = log.entries();
    for expected in ["Query.hello:ok", "Query.user:ok", "User.name:ok", "Query.fail:err:boom"] {
        assert!(entries.iter().any(|entry| entry == expected), "missing {expected} in {entries:?}");
    }
}

struct SchemaProbe(Log);

#[async_trait]
impl Plugin for SchemaProbe {
    async fn on_execute(&self, _hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
        let log = self.0.clone();
        Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
            move |done: &mut ExecuteDone| {
                log.push(format!("instrumented:{}", done.args().schema.is_instrumented()));
                Ok(None)
            },
        ))))
    }
}

#[tokio::test]
async fn only_requests_with_resolver_hooks_use_the_instrumented_schema() {
    let log = Log::new();
    orchestrator(SchemaProbe(log.clone())).request(None).run("{ hello }").await.unwrap();
    orchestrator(
        PluginGroupBuilder::new()
            .add(FieldTracer(Log::new()))
            .add(SchemaProbe(log.clone())),
    )
    .request(None)
    .run("{ hello }")
    .await
    .unwrap();
    assert_eq!(log.entries(), ["instrumented:false", "instrumented:true"]);
}
