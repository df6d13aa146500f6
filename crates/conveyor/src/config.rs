//! Engine configuration.

use serde::Deserialize;

/// Behavioural switches for an [`Engine`](crate::Engine).
///
/// A config is fixed at construction and read-only afterwards. Every field
/// has a default, so a host can deserialize a partial section from its own
/// config file or just use [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Expose each step's result to the next step as
    /// [`StepContext::previous`](crate::StepContext::previous).
    pub chain_results: bool,

    /// Fail with [`EngineError::UnconfiguredHandler`](crate::EngineError::UnconfiguredHandler)
    /// when executing a handler id that was never configured. When off, an
    /// unknown id runs as an empty chain and resolves immediately.
    pub strict_handlers: bool,

    /// Fail when reading a dependency key that was never injected. When off,
    /// the lookup returns `None` instead.
    pub strict_dependencies: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_results: false,
            strict_handlers: true,
            strict_dependencies: true,
        }
    }
}
