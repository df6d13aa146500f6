//! A small host around the conveyor engine: declares a dependency, builds a
//! "save" pipeline plus some global middleware, then runs both.
//!
//! Run with `RUST_LOG=conveyor=debug cargo run -p pipeline-demo` to watch
//! the chains execute.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use conveyor::{Engine, EngineConfig, Signal, StepContext, Steps, from_fn, from_signal_fn};

/// The collaborator the engine requires: an append-only record store.
#[derive(Default)]
struct Store {
    records: Mutex<Vec<Value>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut engine = Engine::new(EngineConfig {
        chain_results: true,
        ..EngineConfig::default()
    });

    // Dependency injection happens after construction but before execution.
    engine.require("store");
    engine.inject("store", Store::default());
    assert!(engine.are_dependencies_satisfied());
    let store = engine.dependency_as::<Store>("store")?.unwrap();

    // Signal-style validation step: rejects null records, otherwise passes
    // the record on as its result.
    let validate = from_signal_fn(|ctx: StepContext, signal: Signal| async move {
        if ctx.primary.is_null() {
            signal.fail("cannot save a null record");
        } else {
            signal.next(ctx.primary);
        }
    });

    // Return-style persistence step: consumes the previous step's result.
    let persist = {
        let store = Arc::clone(&store);
        from_fn(move |ctx: StepContext| {
            let store = Arc::clone(&store);
            async move {
                let record = ctx.previous.unwrap_or(ctx.primary);
                store.records.lock().push(record);
                json!(store.records.lock().len())
            }
        })
    };

    engine.configure("save", Steps::new().then(validate).then(persist))?;

    // Global middleware accumulate across use_ calls; the second one breaks
    // the chain early for oversized payloads.
    engine.use_(from_fn(|ctx: StepContext| async move {
        info!(primary = %ctx.primary, "audit");
    }))?;
    engine.use_(from_signal_fn(|ctx: StepContext, signal: Signal| async move {
        if ctx.primary.as_str().is_some_and(|s| s.len() > 32) {
            signal.stop();
        } else {
            signal.next(ctx.primary);
        }
    }))?;

    let saved = engine
        .execute_handler("save", json!({"name": "ada"}), vec![])
        .await?;
    info!(total = ?saved, "record saved");

    let passed = engine.execute_middleware(json!("short payload"), vec![]).await?;
    info!(result = ?passed, "middleware chain finished");

    Ok(())
}
