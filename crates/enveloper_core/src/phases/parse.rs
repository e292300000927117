use std::sync::Arc;

use enveloper_types::{Context, Document, ParseFn, ParseParams, ParseResult, Value};

use super::extend;
use crate::hooks::{AfterHook, HookOutcome, run_after_hooks, run_before_hooks};
use crate::plugin::Plugin;
use crate::{HookResult, Phase};

/// What [`Plugin::on_parse`] may return.
pub type ParseOutcome = HookOutcome<AfterHook<ParseDone>>;

/// Payload of [`Plugin::on_parse`].
pub struct OnParse {
    context: Context,
    params: ParseParams,
    parse_fn: ParseFn,
    parsed: Option<Document>,
}

impl OnParse {
    /// The request context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.context, extension);
    }

    /// Source and options being parsed.
    #[must_use]
    pub fn params(&self) -> &ParseParams {
        &self.params
    }

    /// The parse function that will run.
    #[must_use]
    pub fn parse_fn(&self) -> &ParseFn {
        &self.parse_fn
    }

    /// Replaces the parse function.
    pub fn set_parse_fn(&mut self, parse_fn: ParseFn) {
        self.parse_fn = parse_fn;
    }

    /// Supplies the document directly; the parse function will not run.
    pub fn set_parsed_document(&mut self, document: Document) {
        self.parsed = Some(document);
    }

    /// Returns `true` once a plugin has supplied the document.
    #[must_use]
    pub fn has_parsed_document(&self) -> bool {
        self.parsed.is_some()
    }
}

/// Payload of parse after-hooks.
pub struct ParseDone {
    context: Context,
    params: ParseParams,
    result: ParseResult,
}

impl ParseDone {
    /// The request context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.context, extension);
    }

    /// Source and options that were parsed.
    #[must_use]
    pub fn params(&self) -> &ParseParams {
        &self.params
    }

    /// The parsed document or the syntax error.
    #[must_use]
    pub fn result(&self) -> &ParseResult {
        &self.result
    }

    /// Replaces the parse outcome returned to the caller.
    pub fn replace_parse_result(&mut self, result: ParseResult) {
        self.result = result;
    }
}

/// Runs the parse phase.
pub(crate) async fn parse(
    plugins: &[Arc<dyn Plugin>],
    context: Context,
    params: ParseParams,
    parse_fn: ParseFn,
) -> HookResult<ParseResult> {
    let mut hook = OnParse {
        context,
        params,
        parse_fn,
        parsed: None,
    };
    let afters = run_before_hooks(
        Phase::Parse,
        plugins,
        &mut hook,
        |plugin, hook| plugin.on_parse(hook),
        |_| false,
    )
    .await?;

    let OnParse {
        context,
        params,
        parse_fn,
        parsed,
    } = hook;
    let result = match parsed {
        Some(document) => {
            tracing::debug!("parse skipped, document supplied by plugin");
            Ok(document)
        }
        None => parse_fn(&params),
    };

    let mut done = ParseDone {
        context,
        params,
        result,
    };
    run_after_hooks(Phase::Parse, afters, &mut done).await?;
    Ok(done.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use enveloper_test_utils::parse_document;
    use enveloper_types::{GraphQLError, parse_fn};
    use serde_json::json;

    struct Engine;

    #[async_trait]
    impl Plugin for Engine {
        async fn on_parse(&self, hook: &mut OnParse) -> HookResult<ParseOutcome> {
            hook.set_parse_fn(parse_fn(enveloper_test_utils::parse));
            Ok(HookOutcome::Continue)
        }
    }

    struct Cached(Document);

    #[async_trait]
    impl Plugin for Cached {
        async fn on_parse(&self, hook: &mut OnParse) -> HookResult<ParseOutcome> {
            hook.set_parsed_document(self.0.clone());
            hook.extend_context(json!({ "cached": true }));
            Ok(HookOutcome::Continue)
        }
    }

    struct Rewrite;

    #[async_trait]
    impl Plugin for Rewrite {
        async fn on_parse(&self, _hook: &mut OnParse) -> HookResult<ParseOutcome> {
            Ok(HookOutcome::After(AfterHook::sync(|done: &mut ParseDone| {
                if done.result().is_err() {
                    done.replace_parse_result(Err(GraphQLError::new("rewritten")));
                }
                Ok(())
            })))
        }
    }

    fn unconfigured() -> ParseFn {
        parse_fn(|_| Err(GraphQLError::new("unconfigured")))
    }

    #[tokio::test]
    async fn plugin_supplied_parse_fn_wins() {
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Engine)];
        let result = parse(&plugins, Context::new(), "{ hello }".into(), unconfigured()).await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn supplied_document_skips_parse_fn() {
        let document = parse_document("{ hello }").unwrap();
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Cached(document))];
        let context = Context::new();
        let result = parse(&plugins, context.clone(), "not graphql".into(), unconfigured()).await.unwrap();
        assert!(result.is_ok());
        assert_eq!(context.get("cached"), Some(json!(true)));
    }

    #[tokio::test]
    async fn syntax_errors_are_data_and_replaceable() {
        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(Engine), Arc::new(Rewrite)];
        let result = parse(&plugins, Context::new(), "{ hello ".into(), unconfigured()).await.unwrap();
        assert_eq!(result.unwrap_err().message, "rewritten");
    }
}
