//! Hook outcomes and the before/after combinator.
//!
//! Every phase follows the same shape:
//!
//! 1. Each plugin's before-hook runs in list order, awaited one at a time,
//!    against a shared mutable payload.
//! 2. A before-hook may return [`HookOutcome::After`] to be called back once
//!    the phase operation has finished.
//! 3. The operation runs.
//! 4. The collected after-hooks run in collection order against the result
//!    payload.
//!
//! The first hook error aborts the phase. Mutations already applied to the
//! shared context stay in place.
//!
//! # Example
//!
//! ```ignore
//! async fn on_parse(&self, hook: &mut OnParse) -> HookResult<ParseOutcome> {
//!     let started = Instant::now();
//!     Ok(HookOutcome::After(AfterHook::sync(move |done: &mut ParseDone| {
//!         tracing::debug!(elapsed = ?started.elapsed(), ok = done.result().is_ok(), "parsed");
//!         Ok(())
//!     })))
//! }
//! ```

mod runner;

pub(crate) use runner::{collect_after_hooks, run_after_hooks, run_before_hooks};

use core::fmt;

use enveloper_types::BoxFuture;

use crate::HookResult;

/// What a before-hook asks the pipeline to do once the phase completes.
#[must_use]
pub enum HookOutcome<A> {
    /// Nothing further.
    Continue,
    /// Run this after-hook when the phase operation has finished.
    After(A),
}

impl<A> HookOutcome<A> {
    /// Returns the after-hook, if any.
    pub fn into_after(self) -> Option<A> {
        match self {
            Self::Continue => None,
            Self::After(after) => Some(after),
        }
    }

    /// Returns `true` for [`HookOutcome::After`].
    #[must_use]
    pub fn is_after(&self) -> bool {
        matches!(self, Self::After(_))
    }
}

impl<A> Default for HookOutcome<A> {
    fn default() -> Self {
        Self::Continue
    }
}

impl<A> From<Option<A>> for HookOutcome<A> {
    fn from(after: Option<A>) -> Self {
        after.map_or(Self::Continue, Self::After)
    }
}

impl<A> fmt::Debug for HookOutcome<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("Continue"),
            Self::After(_) => f.write_str("After(..)"),
        }
    }
}

type AfterCallback<P, R> = Box<dyn for<'a> FnOnce(&'a mut P) -> BoxFuture<'a, HookResult<R>> + Send>;

/// A one-shot callback run after a phase operation with mutable access to
/// its result payload `P`, producing `R`.
pub struct AfterHook<P, R = ()> {
    callback: AfterCallback<P, R>,
}

impl<P, R> AfterHook<P, R> {
    /// Wraps an async callback.
    ///
    /// ```ignore
    /// AfterHook::new(|done: &mut ExecuteDone| Box::pin(async move {
    ///     audit.record(done.result()).await?;
    ///     Ok(None)
    /// }))
    /// ```
    pub fn new<F>(callback: F) -> Self
    where
        F: for<'a> FnOnce(&'a mut P) -> BoxFuture<'a, HookResult<R>> + Send + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Wraps a synchronous callback.
    pub fn sync<F>(callback: F) -> Self
    where
        F: FnOnce(&mut P) -> HookResult<R> + Send + 'static,
        R: Send + 'static,
    {
        Self::new(move |payload: &mut P| {
            let outcome = callback(payload);
            Box::pin(futures::future::ready(outcome))
        })
    }

    pub(crate) async fn call(self, payload: &mut P) -> HookResult<R> {
        (self.callback)(payload).await
    }
}

impl<P, R> fmt::Debug for AfterHook<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AfterHook(..)")
    }
}
