//! Plugin-hook orchestration for GraphQL execution pipelines.
//!

pub use enveloper_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use enveloper_internal::prelude::*;
}
