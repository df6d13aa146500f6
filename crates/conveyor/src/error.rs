//! Error types for the conveyor engine.
//!
//! Registration failures are synchronous and surface before any chain runs;
//! execution failures travel through the chain's future to the caller.

use thiserror::Error;

/// Boxed error carried by a failing middleware step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while registering handlers or middleware.
///
/// These are fail-fast: an engine whose setup phase completed without one of
/// these holds only non-empty, runnable sequences.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegisterError {
    /// `configure` was given no usable middleware for the named handler.
    #[error("handler '{0}' requires at least one middleware")]
    EmptyHandler(String),

    /// `use_` was given no usable middleware.
    #[error("at least one middleware must be provided")]
    EmptyMiddleware,
}

/// Errors raised while executing a chain.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The handler id has no registered sequence (strict mode only).
    #[error("the handler '{0}' has not been configured")]
    UnconfiguredHandler(String),

    /// A dependency key was read before being injected (strict mode only).
    #[cfg(feature = "inject")]
    #[error("missing dependency '{0}'")]
    MissingDependency(String),

    /// A middleware step failed; the chain was aborted.
    #[error("middleware failed: {0}")]
    Middleware(BoxError),

    /// A middleware deferred to its completion signal, then dropped every
    /// handle to it without firing. The step can never settle, so the chain
    /// fails instead of stalling.
    #[error("middleware dropped its completion signal without calling it")]
    AbandonedSignal,
}
