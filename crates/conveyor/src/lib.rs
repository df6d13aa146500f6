//! # Conveyor
//!
//! An embeddable execution engine for ordered, asynchronous middleware
//! chains.
//!
//! A host registers named handler pipelines and a global middleware list,
//! then drives either as one strictly sequential chain. Middleware may
//! complete by returning a value (sync or async) or by firing a completion
//! [`Signal`]; both conventions are normalized into one uniform step, and a
//! step can break its chain early without surfacing an error.
//!
//! This crate is the entire artifact: there is no CLI, persistence, or
//! network layer around it.
//!
//! # Example
//!
//! ```rust,ignore
//! use conveyor::{Engine, EngineConfig, Signal, StepContext, Steps, from_fn, from_signal_fn};
//! use serde_json::json;
//!
//! let mut engine = Engine::new(EngineConfig {
//!     chain_results: true,
//!     ..EngineConfig::default()
//! });
//!
//! engine.configure(
//!     "save",
//!     Steps::new()
//!         .then(from_signal_fn(|ctx: StepContext, signal: Signal| async move {
//!             signal.next(json!({"validated": ctx.primary}));
//!         }))
//!         .then(from_fn(|ctx: StepContext| async move {
//!             // Sees the previous step's result because chain_results is on.
//!             ctx.previous.unwrap_or_default()
//!         })),
//! )?;
//!
//! let result = engine.execute_handler("save", json!("record"), vec![]).await?;
//! ```
//!
//! # Completion conventions
//!
//! - [`from_fn`] / [`from_value_fn`] — return-style: the function's return
//!   value completes the step via [`IntoFlow`].
//! - [`from_signal_fn`] — signal-style: the step completes when the
//!   [`Signal`] fires ([`next`](Signal::next), [`stop`](Signal::stop) or
//!   [`fail`](Signal::fail)), possibly from a spawned task.
//! - Implementing [`Middleware`] directly allows mixing both; the first
//!   settled source wins.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod steps;

mod chain;
mod step;

#[cfg(feature = "inject")]
mod inject;

pub use config::EngineConfig;
pub use context::StepContext;
pub use engine::Engine;
pub use error::{BoxError, EngineError, RegisterError};
pub use middleware::{
    BoxedMiddleware, CallResult, Flow, IntoFlow, Middleware, Signal, from_fn, from_signal_fn,
    from_value_fn,
};
pub use steps::{IntoSteps, Steps};

#[cfg(feature = "inject")]
pub use inject::Dependency;
