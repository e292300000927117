//! Context building, parsing and validation.
//!
//! Each phase owns a before-payload handed to every plugin in order and an
//! after-payload handed to the after-hooks those plugins returned. The phase
//! function itself (parse, validate) is chosen by the plugins: the last
//! plugin to call its setter wins.

mod context;
mod parse;
mod validate;

pub use context::{ContextBuildingOutcome, ContextBuilt, OnContextBuilding};
pub use parse::{OnParse, ParseDone, ParseOutcome};
pub use validate::{OnValidate, ValidateDone, ValidateOutcome};

pub(crate) use context::build_context;
pub(crate) use parse::parse;
pub(crate) use validate::validate;

use enveloper_types::{Context, Value};

/// Merges `extension` into `context`, logging non-object input.
pub(crate) fn extend(context: &Context, extension: Value) {
    if !context.extend(extension) {
        tracing::warn!("context extension ignored, expected a JSON object");
    }
}
