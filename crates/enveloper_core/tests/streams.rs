//! Subscription and result-stream behavior.

mod common;

use common::{Log, orchestrator};
use enveloper_core::PluginGroupBuilder;
use enveloper_core::prelude::*;
use enveloper_test_utils::fixtures;
use enveloper_types::{ExecutionOutput, ExecutionResult, ResultStream};
use futures::StreamExt;
use serde_json::json;

/// Records every stream callback of a subscription.
struct StreamJournal(Log);

#[async_trait]
impl Plugin for StreamJournal {
    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        let (next, end, error, failure) = (self.0.clone(), self.0.clone(), self.0.clone(), self.0.clone());
        Ok(HookOutcome::After(
            SubscribeHooks::new()
                .on_subscribe_result(AfterHook::sync(move |done: &mut ExecuteDone| {
                    assert!(done.is_stream());
                    Ok(Some(
                        StreamHooks::new()
                            .on_next_sync(move |item| {
                                next.push(format!("next:{}", item.result().data.clone().unwrap_or_default()));
                                Ok(())
                            })
                            .on_end(move || end.push("end"))
                            .on_error(move |_| error.push("error")),
                    ))
                }))
                .on_subscribe_error(move |source| failure.push(format!("subscribe error:{}", source.error()))),
        ))
    }
}

/// Rewrites every subscription item to `{ "alphabet": "x" }`.
struct Rewrite;

#[async_trait]
impl Plugin for Rewrite {
    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        Ok(HookOutcome::After(SubscribeHooks::new().on_subscribe_result(AfterHook::sync(
            |done: &mut ExecuteDone| {
                done.for_each_result(|_, result| {
                    result.data = Some(json!({ "alphabet": "x" }));
                    Ok(())
                })
            },
        ))))
    }
}

async fn subscribe(plugins: impl enveloper_core::Plugins, query: &str) -> ResultStream {
    match orchestrator(plugins).request(None).run(query).await.unwrap() {
        ExecutionOutput::Stream(stream) => stream,
        ExecutionOutput::Single(result) => panic!("expected a stream, got {result:?}"),
    }
}

#[tokio::test]
async fn each_item_is_observed_then_end_runs_once() {
    let log = Log::new();
    let stream = subscribe(StreamJournal(log.clone()), "subscription { countdown(from: 2) }").await;
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 3);
    assert_eq!(
        log.entries(),
        [
            r#"next:{"countdown":2}"#,
            r#"next:{"countdown":1}"#,
            r#"next:{"countdown":0}"#,
            "end",
        ]
    );
}

#[tokio::test]
async fn source_error_after_partial_emission_takes_the_error_path_once() {
    let log = Log::new();
    let stream = subscribe(StreamJournal(log.clone()), "subscription { faulty(after: 2) }").await;
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 3);
    assert!(items[..2].iter().all(Result::is_ok));
    assert_eq!(items[2].as_ref().unwrap_err().to_string(), fixtures::SOURCE_FAILURE);
    assert_eq!(log.count("end"), 0);
    assert_eq!(log.count("error"), 1);
    assert_eq!(log.count(&format!("subscribe error:{}", fixtures::SOURCE_FAILURE)), 1);
    assert_eq!(log.entries().iter().filter(|entry| entry.starts_with("next:")).count(), 2);
}

#[tokio::test]
async fn dropping_the_stream_early_runs_end_once() {
    let log = Log::new();
    let mut stream = subscribe(StreamJournal(log.clone()), "subscription { alphabet }").await;
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.data, Some(json!({ "alphabet": "a" })));
    drop(stream);

    assert_eq!(log.entries(), [r#"next:{"alphabet":"a"}"#, "end"]);
}

#[tokio::test]
async fn alphabet_items_are_rewritten_for_the_consumer() {
    let log = Log::new();
    let stream = subscribe(
        PluginGroupBuilder::new().add(Rewrite).add(StreamJournal(log.clone())),
        "subscription { alphabet }",
    )
    .await;
    let items: Vec<_> = stream.map(|item| item.unwrap().data.unwrap()).collect().await;

    assert_eq!(items, vec![json!({ "alphabet": "x" }); 4]);
    assert_eq!(log.count(r#"next:{"alphabet":"x"}"#), 4);
    assert_eq!(log.count("end"), 1);
}

#[tokio::test]
async fn streams_from_execute_get_the_same_callbacks() {
    struct Streaming(Log);

    #[async_trait]
    impl Plugin for Streaming {
        async fn on_execute(&self, hook: &mut OnExecute) -> HookResult<HookOutcome<ExecuteHooks>> {
            hook.set_execute_fn(enveloper_types::execute_fn(enveloper_test_utils::subscribe));
            let log = self.0.clone();
            Ok(HookOutcome::After(ExecuteHooks::new().on_execute_done(AfterHook::sync(
                move |done: &mut ExecuteDone| {
                    log.push(format!("stream:{}", done.is_stream()));
                    assert!(done.result().is_none());
                    let end = log.clone();
                    Ok(Some(StreamHooks::new().on_end(move || end.push("end"))))
                },
            ))))
        }
    }

    let log = Log::new();
    let orchestrator = orchestrator(Streaming(log.clone()));
    let document = enveloper_test_utils::parse_document("subscription { countdown(from: 1) }").unwrap();
    let output = orchestrator
        .request(None)
        .execute((orchestrator.schema().unwrap(), document))
        .await
        .unwrap();
    assert_eq!(output.into_stream().unwrap().count().await, 2);
    assert_eq!(log.entries(), ["stream:true", "end"]);
}

/// Holds a resource from its `on_subscribe_result` hook until the stream ends.
struct Holder(Log);

#[async_trait]
impl Plugin for Holder {
    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        let log = self.0.clone();
        Ok(HookOutcome::After(SubscribeHooks::new().on_subscribe_result(AfterHook::sync(
            move |_: &mut ExecuteDone| {
                log.push("acquired");
                let release = log.clone();
                Ok(Some(StreamHooks::new().on_end(move || release.push("released"))))
            },
        ))))
    }
}

/// Replaces the subscription stream with a single result.
struct ReplaceWithSingle;

#[async_trait]
impl Plugin for ReplaceWithSingle {
    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        Ok(HookOutcome::After(SubscribeHooks::new().on_subscribe_result(AfterHook::sync(
            |done: &mut ExecuteDone| {
                done.set_result(ExecutionResult::from_data(json!({ "replaced": true })));
                Ok(None)
            },
        ))))
    }
}

/// Fails in its `on_subscribe_result` hook.
struct FailAfter;

#[async_trait]
impl Plugin for FailAfter {
    async fn on_subscribe(&self, _hook: &mut OnSubscribe) -> HookResult<HookOutcome<SubscribeHooks>> {
        Ok(HookOutcome::After(SubscribeHooks::new().on_subscribe_result(AfterHook::sync(
            |_: &mut ExecuteDone| Err("result hook failed".into()),
        ))))
    }
}

#[tokio::test]
async fn replacing_the_stream_with_a_single_result_still_ends_earlier_callbacks() {
    let log = Log::new();
    let output = orchestrator(PluginGroupBuilder::new().add(Holder(log.clone())).add(ReplaceWithSingle))
        .request(None)
        .run("subscription { alphabet }")
        .await
        .unwrap();

    assert_eq!(output.into_single().unwrap().data, Some(json!({ "replaced": true })));
    assert_eq!(log.entries(), ["acquired", "released"]);
}

#[tokio::test]
async fn a_failing_later_result_hook_still_ends_earlier_callbacks() {
    let log = Log::new();
    let error = orchestrator(PluginGroupBuilder::new().add(Holder(log.clone())).add(FailAfter))
        .request(None)
        .run("subscription { alphabet }")
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "result hook failed");
    assert_eq!(log.entries(), ["acquired", "released"]);
}
