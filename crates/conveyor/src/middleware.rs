//! The middleware contract: step outcomes, the completion signal, and
//! function adapters.
//!
//! A middleware can complete a step in two ways:
//!
//! - **Return style** — its future resolves with `Ok(Some(flow))` (or an
//!   error). Plain async functions and sync functions are lifted into this
//!   convention by [`from_fn`] and [`from_value_fn`] via the [`IntoFlow`]
//!   ladder.
//! - **Signal style** — its future resolves with `Ok(None)` and the outcome
//!   arrives through the [`Signal`] handle instead, possibly from a spawned
//!   task. [`from_signal_fn`] wraps functions written this way.
//!
//! The step executor races the two sources and settles each step exactly
//! once, whichever source fires first.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::context::StepContext;
use crate::error::BoxError;

// =============================================================================
// Flow — tagged step outcome
// =============================================================================

/// The successful outcome of one middleware step.
///
/// Failure is not a `Flow` variant; it is the `Err` arm of the step result,
/// so a chain break can never be confused with an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// The chain proceeds; the value becomes the running result.
    Continue(Value),

    /// The chain ends here, early, and still counts as overall success.
    Break,
}

/// What a middleware's own future resolves with.
///
/// `Ok(Some(_))` completes the step by return value, `Ok(None)` defers to
/// the [`Signal`], and `Err(_)` fails the step (and the chain).
pub type CallResult = Result<Option<Flow>, BoxError>;

/// Outcome transported over the signal channel.
pub(crate) type StepOutcome = Result<Flow, BoxError>;

// =============================================================================
// Middleware trait
// =============================================================================

/// A single unit of work in a chain.
///
/// Most middleware are plain functions wrapped by [`from_fn`],
/// [`from_signal_fn`] or [`from_value_fn`]; implement the trait directly
/// only when a middleware needs to mix both completion conventions.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Run this middleware for one step.
    async fn call(&self, ctx: StepContext, signal: Signal) -> CallResult;
}

/// A type-erased, shareable middleware as stored in the registries.
pub type BoxedMiddleware = Arc<dyn Middleware>;

// =============================================================================
// Signal — fire-once completion handle
// =============================================================================

/// Completion handle given to every middleware invocation.
///
/// Cloning is cheap; all clones share one underlying channel and only the
/// first of [`next`](Self::next) / [`stop`](Self::stop) / [`fail`](Self::fail)
/// wins. Later calls are silently ignored, so a middleware that signals and
/// then also returns cannot settle its step twice.
#[derive(Clone)]
pub struct Signal {
    tx: Arc<Mutex<Option<oneshot::Sender<StepOutcome>>>>,
}

impl Signal {
    pub(crate) fn new(tx: oneshot::Sender<StepOutcome>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Complete the step successfully with `value`.
    pub fn next(&self, value: impl Into<Value>) {
        self.settle(Ok(Flow::Continue(value.into())));
    }

    /// End the entire enclosing chain early. Not an error: the chain still
    /// resolves successfully, it just runs no further steps.
    pub fn stop(&self) {
        self.settle(Ok(Flow::Break));
    }

    /// Fail the step, aborting the chain with `error`.
    pub fn fail(&self, error: impl Into<BoxError>) {
        self.settle(Err(error.into()));
    }

    /// Whether a completion has already been sent through this signal.
    pub fn is_settled(&self) -> bool {
        self.tx.lock().is_none()
    }

    fn settle(&self, outcome: StepOutcome) {
        if let Some(tx) = self.tx.lock().take() {
            // The receiver is gone once the step has settled some other way.
            let _ = tx.send(outcome);
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("settled", &self.is_settled())
            .finish()
    }
}

// =============================================================================
// IntoFlow — return-value ladder for function middleware
// =============================================================================

/// Conversion from a function middleware's return value into a [`CallResult`].
pub trait IntoFlow {
    /// Convert this value into a step outcome.
    fn into_flow(self) -> CallResult;
}

/// `()` continues the chain with a null result.
impl IntoFlow for () {
    fn into_flow(self) -> CallResult {
        Ok(Some(Flow::Continue(Value::Null)))
    }
}

/// A bare value continues the chain with that value.
impl IntoFlow for Value {
    fn into_flow(self) -> CallResult {
        Ok(Some(Flow::Continue(self)))
    }
}

/// An explicit [`Flow`] is passed through, allowing return-style breaks.
impl IntoFlow for Flow {
    fn into_flow(self) -> CallResult {
        Ok(Some(self))
    }
}

/// `Ok` converts the inner value; `Err` fails the step.
impl<T: IntoFlow, E: Into<BoxError>> IntoFlow for Result<T, E> {
    fn into_flow(self) -> CallResult {
        match self {
            Ok(value) => value.into_flow(),
            Err(error) => Err(error.into()),
        }
    }
}

// =============================================================================
// Function adapters
// =============================================================================

struct FnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(StepContext) -> BoxFuture<'static, CallResult> + Send + Sync,
{
    async fn call(&self, ctx: StepContext, _signal: Signal) -> CallResult {
        (self.0)(ctx).await
    }
}

struct SignalFnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for SignalFnMiddleware<F>
where
    F: Fn(StepContext, Signal) -> BoxFuture<'static, ()> + Send + Sync,
{
    async fn call(&self, ctx: StepContext, signal: Signal) -> CallResult {
        (self.0)(ctx, signal).await;
        Ok(None)
    }
}

/// Wraps an async function into a return-style middleware.
///
/// The function's return value completes the step through [`IntoFlow`]; the
/// completion signal is never exposed to it.
///
/// ```rust,ignore
/// let double = from_fn(|ctx: StepContext| async move {
///     json!(ctx.primary.as_i64().unwrap_or(0) * 2)
/// });
/// ```
pub fn from_fn<F, Fut, R>(f: F) -> BoxedMiddleware
where
    F: Fn(StepContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + 'static,
{
    Arc::new(FnMiddleware(move |ctx: StepContext| -> BoxFuture<'static, CallResult> {
        let fut = f(ctx);
        Box::pin(async move { fut.await.into_flow() })
    }))
}

/// Wraps a function that completes via its [`Signal`].
///
/// The function's own future only sequences its body; the step's outcome
/// rides on the signal, which may also be cloned into a spawned task and
/// fired later.
///
/// ```rust,ignore
/// let audit = from_signal_fn(|ctx: StepContext, signal: Signal| async move {
///     if ctx.primary.is_null() {
///         signal.fail("nothing to audit");
///     } else {
///         signal.next(ctx.primary);
///     }
/// });
/// ```
pub fn from_signal_fn<F, Fut>(f: F) -> BoxedMiddleware
where
    F: Fn(StepContext, Signal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(SignalFnMiddleware(
        move |ctx: StepContext, signal: Signal| -> BoxFuture<'static, ()> {
            Box::pin(f(ctx, signal))
        },
    ))
}

/// Wraps a plain synchronous function; its return value completes the step.
pub fn from_value_fn<F, R>(f: F) -> BoxedMiddleware
where
    F: Fn(StepContext) -> R + Send + Sync + 'static,
    R: IntoFlow + Send + 'static,
{
    from_fn(move |ctx| {
        let out = f(ctx);
        async move { out }
    })
}
