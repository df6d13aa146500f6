//! Dependency registry.
//!
//! Hosts declare which collaborator keys an engine expects, inject values
//! for them after construction, and look them up from inside middleware.
//! Values are type-erased: the map stores `Arc<dyn Any + Send + Sync>` and
//! consumers downcast back to the concrete type.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::EngineError;

/// A type-erased injected dependency.
///
/// Downcast back with [`Engine::dependency_as`](crate::Engine::dependency_as).
pub type Dependency = Arc<dyn Any + Send + Sync>;

/// Declared requirement keys plus the injected key→value map.
#[derive(Default)]
pub(crate) struct Dependencies {
    required: Vec<String>,
    injected: HashMap<String, Dependency>,
}

impl Dependencies {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Declares a requirement key. Duplicate declarations collapse.
    pub(crate) fn require(&mut self, key: String) {
        if !self.required.contains(&key) {
            self.required.push(key);
        }
    }

    pub(crate) fn requires(&self) -> &[String] {
        &self.required
    }

    /// Stores `value` under `key`, overwriting any previous value.
    pub(crate) fn insert(&mut self, key: String, value: Dependency) {
        debug!(key = %key, "injected dependency");
        self.injected.insert(key, value);
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.injected.contains_key(key)
    }

    /// Whether every declared requirement has been injected.
    pub(crate) fn satisfied(&self) -> bool {
        self.required.iter().all(|key| self.contains(key))
    }

    /// Looks up `key`. Strict mode turns an absent key into
    /// [`EngineError::MissingDependency`]; lenient mode returns `None`.
    pub(crate) fn get(&self, key: &str, strict: bool) -> Result<Option<Dependency>, EngineError> {
        match self.injected.get(key) {
            Some(value) => Ok(Some(Arc::clone(value))),
            None if strict => Err(EngineError::MissingDependency(key.to_string())),
            None => Ok(None),
        }
    }
}
