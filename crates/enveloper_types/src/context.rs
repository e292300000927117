//! Per-request context.
//!
//! A [`Context`] is a cheap, cloneable handle to one shared map. Every clone
//! observes the same entries, so a key written by one plugin is visible to
//! every later plugin, engine function and resolver of the same request.
//!
//! Besides JSON entries the context carries type-keyed extension slots for
//! values that have no JSON representation (database handles, hook state).
//!
//! # Example
//!
//! ```
//! use enveloper_types::Context;
//! use serde_json::json;
//!
//! let ctx = Context::new();
//! let alias = ctx.clone();
//!
//! ctx.extend(json!({ "user": "ada" }));
//! assert_eq!(alias.get("user"), Some(json!("ada")));
//! assert!(Context::ptr_eq(&ctx, &alias));
//! ```

use core::any::{Any, TypeId};
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::{Map, Value};

#[derive(Default)]
struct ContextData {
    values: Map,
    extensions: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

/// Shared per-request context.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<RwLock<ContextData>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when both handles refer to the same context.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Merges the entries of a JSON object into the context.
    ///
    /// Existing keys are overwritten. Returns `false` and leaves the context
    /// untouched when `extension` is not an object.
    pub fn extend(&self, extension: Value) -> bool {
        match extension {
            Value::Object(entries) => {
                self.extend_entries(entries);
                true
            }
            _ => false,
        }
    }

    /// Merges key/value pairs into the context.
    pub fn extend_entries(&self, entries: impl IntoIterator<Item = (String, Value)>) {
        let mut data = self.inner.write();
        for (key, value) in entries {
            data.values.insert(key, value);
        }
    }

    /// Inserts a single entry, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.write().values.insert(key.into(), value.into())
    }

    /// Returns a copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().values.get(key).cloned()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().values.contains_key(key)
    }

    /// Removes an entry.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.write().values.remove(key)
    }

    /// Returns the current keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().values.keys().cloned().collect()
    }

    /// Returns the number of JSON entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().values.len()
    }

    /// Returns `true` if there are no JSON entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().values.is_empty()
    }

    /// Returns a point-in-time copy of all JSON entries.
    #[must_use]
    pub fn snapshot(&self) -> Map {
        self.inner.read().values.clone()
    }

    /// Stores a typed extension, replacing any previous value of the same type.
    pub fn insert_extension<T: Any + Send + Sync>(&self, value: T) {
        self.inner
            .write()
            .extensions
            .insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Returns the typed extension of type `T`, if present.
    #[must_use]
    pub fn extension<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let slot = self.inner.read().extensions.get(&TypeId::of::<T>()).cloned()?;
        slot.downcast::<T>().ok()
    }

    /// Removes the typed extension of type `T`.
    pub fn remove_extension<T: Any + Send + Sync>(&self) -> bool {
        self.inner.write().extensions.remove(&TypeId::of::<T>()).is_some()
    }
}

impl From<Map> for Context {
    fn from(values: Map) -> Self {
        let ctx = Self::new();
        ctx.extend_entries(values);
        ctx
    }
}

impl From<Value> for Context {
    /// Builds a context from a JSON object; other values yield an empty context.
    fn from(value: Value) -> Self {
        let ctx = Self::new();
        ctx.extend(value);
        ctx
    }
}

impl From<Option<Context>> for Context {
    fn from(value: Option<Context>) -> Self {
        value.unwrap_or_default()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.read();
        f.debug_struct("Context")
            .field("values", &data.values)
            .field("extensions", &data.extensions.len())
            .finish()
    }
}
