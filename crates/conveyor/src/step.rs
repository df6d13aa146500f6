//! Single-step executor.
//!
//! Normalizes the two middleware completion conventions into one awaited
//! outcome by racing the middleware's own future against its [`Signal`]
//! channel. A step settles exactly once:
//!
//! - signal fired first → that outcome wins and the remainder of the
//!   middleware body is cancelled by dropping its future;
//! - future resolved first with `Ok(Some(_))` or `Err(_)` → the return
//!   value wins;
//! - future resolved first with `Ok(None)` → the step waits on the signal,
//!   which may be fired from a task the middleware spawned.
//!
//! A middleware that holds its signal forever without firing stalls the
//! chain; the engine imposes no timeout. A middleware that *drops* every
//! signal handle unfired can never settle, which is detectable, so the step
//! fails with [`EngineError::AbandonedSignal`] instead of hanging.

use futures::future::{Either, select};
use tokio::sync::oneshot;

use crate::context::StepContext;
use crate::error::EngineError;
use crate::middleware::{Flow, Middleware, Signal, StepOutcome};

/// Runs exactly one middleware and awaits its single settled outcome.
pub(crate) async fn run_step(
    middleware: &dyn Middleware,
    ctx: StepContext,
) -> Result<Flow, EngineError> {
    let (tx, rx) = oneshot::channel::<StepOutcome>();

    // The middleware receives the only handle; no local clone is kept, so
    // the receiver errors as soon as every handle is dropped unfired.
    let call = middleware.call(ctx, Signal::new(tx));

    match select(rx, call).await {
        Either::Left((Ok(outcome), _cancelled_body)) => settled(outcome),
        Either::Left((Err(_), call)) => {
            // All signal handles are gone while the body still runs, so the
            // return value is the only completion source left.
            match call.await {
                Ok(Some(flow)) => Ok(flow),
                Ok(None) => Err(EngineError::AbandonedSignal),
                Err(error) => Err(EngineError::Middleware(error)),
            }
        }
        Either::Right((returned, rx)) => match returned {
            Ok(Some(flow)) => Ok(flow),
            Ok(None) => match rx.await {
                Ok(outcome) => settled(outcome),
                Err(_) => Err(EngineError::AbandonedSignal),
            },
            Err(error) => Err(EngineError::Middleware(error)),
        },
    }
}

fn settled(outcome: StepOutcome) -> Result<Flow, EngineError> {
    outcome.map_err(EngineError::Middleware)
}
