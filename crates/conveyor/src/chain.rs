//! Chain executor.
//!
//! Composes an ordered middleware sequence into one awaited result. Steps
//! run strictly front to back, never in parallel: the side effects of step N
//! are observed (success or failure) before step N+1 starts. A
//! [`Flow::Break`] ends the chain early and is absorbed — the chain still
//! resolves successfully; any other failure aborts the chain immediately.

use serde_json::Value;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::context::StepContext;
use crate::error::EngineError;
use crate::middleware::{BoxedMiddleware, Flow};
use crate::step::run_step;

/// Runs `steps` in order over `(primary, args)`.
///
/// Resolves with the last step's result, or `None` for an empty or broken
/// chain. The previous step's result is forwarded to the next step only when
/// `chain_results` is configured.
pub(crate) async fn run_chain(
    steps: &[BoxedMiddleware],
    config: &EngineConfig,
    primary: Value,
    args: Vec<Value>,
) -> Result<Option<Value>, EngineError> {
    let mut previous = Value::Null;
    let mut last = None;

    for (index, middleware) in steps.iter().enumerate() {
        let ctx = StepContext {
            primary: primary.clone(),
            args: args.clone(),
            previous: config.chain_results.then(|| previous.clone()),
        };

        match run_step(middleware.as_ref(), ctx).await {
            Ok(Flow::Continue(value)) => {
                trace!(step = index, "step completed");
                previous = value.clone();
                last = Some(value);
            }
            Ok(Flow::Break) => {
                debug!(step = index, "chain broken early");
                return Ok(None);
            }
            Err(error) => {
                debug!(step = index, error = %error, "chain aborted");
                return Err(error);
            }
        }
    }

    Ok(last)
}
