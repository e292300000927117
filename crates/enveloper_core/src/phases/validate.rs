use std::sync::Arc;

use enveloper_types::{Context, GraphQLError, ValidateFn, ValidateParams, ValidationRule, Value};

use super::extend;
use crate::hooks::{AfterHook, HookOutcome, run_after_hooks, run_before_hooks};
use crate::plugin::Plugin;
use crate::{HookResult, Phase};

/// What [`Plugin::on_validate`] may return.
pub type ValidateOutcome = HookOutcome<AfterHook<ValidateDone>>;

/// Payload of [`Plugin::on_validate`].
pub struct OnValidate {
    context: Context,
    params: ValidateParams,
    validate_fn: ValidateFn,
    result: Option<Vec<GraphQLError>>,
}

impl OnValidate {
    /// The request context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.context, extension);
    }

    /// Schema, document and rules to validate with.
    #[must_use]
    pub fn params(&self) -> &ValidateParams {
        &self.params
    }

    /// Adds a rule run in addition to the engine's built-in rules.
    pub fn add_validation_rule(&mut self, rule: ValidationRule) {
        self.params.rules.push(rule);
    }

    /// The validate function that will run.
    #[must_use]
    pub fn validate_fn(&self) -> &ValidateFn {
        &self.validate_fn
    }

    /// Replaces the validate function.
    pub fn set_validation_fn(&mut self, validate_fn: ValidateFn) {
        self.validate_fn = validate_fn;
    }

    /// Supplies the validation outcome; the validate function will not run.
    pub fn set_result(&mut self, errors: Vec<GraphQLError>) {
        self.result = Some(errors);
    }
}

/// Payload of validate after-hooks.
pub struct ValidateDone {
    context: Context,
    params: ValidateParams,
    result: Vec<GraphQLError>,
}

impl ValidateDone {
    /// The request context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Merges the entries of a JSON object into the context.
    pub fn extend_context(&self, extension: Value) {
        extend(&self.context, extension);
    }

    /// Schema, document and rules that were used.
    #[must_use]
    pub fn params(&self) -> &ValidateParams {
        &self.params
    }

    /// `true` when the current result holds no errors.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.result.is_empty()
    }

    /// The validation errors.
    #[must_use]
    pub fn result(&self) -> &[GraphQLError] {
        &self.result
    }

    /// Replaces the validation errors returned to the caller.
    pub fn set_result(&mut self, errors: Vec<GraphQLError>) {
        self.result = errors;
    }
}

/// Runs the validate phase.
pub(crate) async fn validate(
    plugins: &[Arc<dyn Plugin>],
    context: Context,
    params: ValidateParams,
    validate_fn: ValidateFn,
) -> HookResult<Vec<GraphQLError>> {
    let mut hook = OnValidate {
        context,
        params,
        validate_fn,
        result: None,
    };
    let afters = run_before_hooks(
        Phase::Validate,
        plugins,
        &mut hook,
        |plugin, hook| plugin.on_validate(hook),
        |_| false,
    )
    .await?;

    let OnValidate {
        context,
        params,
        validate_fn,
        result,
    } = hook;
    let result = match result {
        Some(errors) => {
            tracing::debug!(errors = errors.len(), "validation result supplied by plugin");
            errors
        }
        None => validate_fn(&params),
    };

    let mut done = ValidateDone {
        context,
        params,
        result,
    };
    run_after_hooks(Phase::Validate, afters, &mut done).await?;
    Ok(done.result)
}
