//! The per-invocation input handed to every middleware.

use serde_json::Value;

/// Everything a single middleware invocation gets to see.
///
/// One `StepContext` is built per step by the chain executor. The primary
/// value and the extra arguments are identical for every step of a chain;
/// only [`previous`](Self::previous) varies as results flow forward.
#[derive(Debug, Clone, PartialEq)]
pub struct StepContext {
    /// The value the chain was triggered with. Opaque to the engine.
    pub primary: Value,

    /// Ordered extra arguments supplied at the trigger call.
    pub args: Vec<Value>,

    /// The preceding step's result.
    ///
    /// `Some` only when the engine was configured with `chain_results`; the
    /// first step of a chain then sees `Some(Value::Null)`. With the default
    /// configuration this is always `None`.
    pub previous: Option<Value>,
}

impl StepContext {
    /// Context for a chain trigger, before any step has produced a result.
    pub fn new(primary: Value, args: Vec<Value>) -> Self {
        Self {
            primary,
            args,
            previous: None,
        }
    }

    /// The extra argument at `index`, if supplied.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}
