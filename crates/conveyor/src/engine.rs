//! The engine: owned registries plus the public registration and execution
//! surface.
//!
//! Registration takes `&mut self` and execution takes `&self`, so the
//! "configure first, execute later" discipline is enforced by the borrow
//! checker: once an engine is shared (for example behind an `Arc`), its
//! registries can no longer change, and any number of independent chains
//! may run concurrently against it.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{Instrument, Level, debug, span};

use crate::chain::run_chain;
use crate::config::EngineConfig;
use crate::error::{EngineError, RegisterError};
use crate::middleware::BoxedMiddleware;
use crate::steps::IntoSteps;

#[cfg(feature = "inject")]
use {
    crate::inject::{Dependencies, Dependency},
    std::any::Any,
    std::sync::Arc,
};

/// An embeddable middleware-chain engine.
///
/// Hosts register named handler pipelines with [`configure`](Self::configure)
/// and global middleware with [`use_`](Self::use_), then trigger execution
/// with [`execute_handler`](Self::execute_handler) or
/// [`execute_middleware`](Self::execute_middleware). Each trigger runs one
/// strictly sequential chain.
pub struct Engine {
    config: EngineConfig,
    handlers: HashMap<String, Vec<BoxedMiddleware>>,
    middleware: Vec<BoxedMiddleware>,
    #[cfg(feature = "inject")]
    dependencies: Dependencies,
}

impl Engine {
    /// Creates an engine with the given configuration and empty registries.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            handlers: HashMap::new(),
            middleware: Vec::new(),
            #[cfg(feature = "inject")]
            dependencies: Dependencies::new(),
        }
    }

    /// The configuration this engine was constructed with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers the middleware sequence for `handler_id`, replacing any
    /// prior sequence wholesale.
    ///
    /// Fails with [`RegisterError::EmptyHandler`] when the sequence is empty
    /// after optional entries have been dropped.
    pub fn configure(
        &mut self,
        handler_id: impl Into<String>,
        steps: impl IntoSteps,
    ) -> Result<(), RegisterError> {
        let handler_id = handler_id.into();
        let steps = steps.into_steps();

        if steps.is_empty() {
            return Err(RegisterError::EmptyHandler(handler_id));
        }

        debug!(handler = %handler_id, steps = steps.len(), "configured handler");
        self.handlers.insert(handler_id, steps.into_inner());
        Ok(())
    }

    /// Whether `handler_id` currently has a registered sequence.
    pub fn is_configured(&self, handler_id: &str) -> bool {
        self.handlers.contains_key(handler_id)
    }

    /// Appends middleware to the global list. Unlike handlers, successive
    /// calls accumulate rather than replace.
    ///
    /// Fails with [`RegisterError::EmptyMiddleware`] when the sequence is
    /// empty after optional entries have been dropped.
    pub fn use_(&mut self, steps: impl IntoSteps) -> Result<(), RegisterError> {
        let steps = steps.into_steps();

        if steps.is_empty() {
            return Err(RegisterError::EmptyMiddleware);
        }

        debug!(steps = steps.len(), "registered middleware");
        self.middleware.extend(steps.into_inner());
        Ok(())
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Runs the chain registered under `handler_id`.
    ///
    /// Resolves with the last step's result, or `None` for a broken chain.
    /// An unknown id fails with [`EngineError::UnconfiguredHandler`] under
    /// `strict_handlers` (the default) and otherwise runs as an empty chain.
    pub async fn execute_handler(
        &self,
        handler_id: &str,
        primary: impl Into<Value>,
        args: Vec<Value>,
    ) -> Result<Option<Value>, EngineError> {
        let span = span!(Level::DEBUG, "handler_chain", handler = %handler_id);
        async move {
            match self.handlers.get(handler_id) {
                Some(steps) => run_chain(steps, &self.config, primary.into(), args).await,
                None if self.config.strict_handlers => {
                    Err(EngineError::UnconfiguredHandler(handler_id.to_string()))
                }
                None => {
                    debug!("unconfigured handler ignored");
                    Ok(None)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Runs the global middleware list as one chain. An empty list resolves
    /// immediately with `None`.
    pub async fn execute_middleware(
        &self,
        primary: impl Into<Value>,
        args: Vec<Value>,
    ) -> Result<Option<Value>, EngineError> {
        let span = span!(Level::DEBUG, "middleware_chain", steps = self.middleware.len());
        run_chain(&self.middleware, &self.config, primary.into(), args)
            .instrument(span)
            .await
    }

    // =========================================================================
    // Dependency injection
    // =========================================================================

    /// Declares a dependency key this engine expects to be injected.
    #[cfg(feature = "inject")]
    pub fn require(&mut self, key: impl Into<String>) {
        self.dependencies.require(key.into());
    }

    /// The declared requirement keys, empty if none were declared.
    #[cfg(feature = "inject")]
    pub fn requires(&self) -> &[String] {
        self.dependencies.requires()
    }

    /// Injects `value` under `key`, overwriting any previous value.
    #[cfg(feature = "inject")]
    pub fn inject(&mut self, key: impl Into<String>, value: impl Any + Send + Sync) {
        self.dependencies.insert(key.into(), Arc::new(value));
    }

    /// Whether a value has been injected for `key`.
    #[cfg(feature = "inject")]
    pub fn has_dependency(&self, key: &str) -> bool {
        self.dependencies.contains(key)
    }

    /// Whether every declared requirement has been injected.
    #[cfg(feature = "inject")]
    pub fn are_dependencies_satisfied(&self) -> bool {
        self.dependencies.satisfied()
    }

    /// Looks up the injected value for `key`.
    ///
    /// Under `strict_dependencies` (the default) an absent key fails with
    /// [`EngineError::MissingDependency`]; otherwise it resolves to `None`.
    #[cfg(feature = "inject")]
    pub fn dependency(&self, key: &str) -> Result<Option<Dependency>, EngineError> {
        self.dependencies.get(key, self.config.strict_dependencies)
    }

    /// Like [`dependency`](Self::dependency), downcast to a concrete type.
    /// Resolves to `None` when the stored value is of a different type.
    #[cfg(feature = "inject")]
    pub fn dependency_as<T: Any + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<Arc<T>>, EngineError> {
        Ok(self
            .dependency(key)?
            .and_then(|value| value.downcast::<T>().ok()))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("handlers", &self.handlers.len())
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::context::StepContext;
    use crate::middleware::{Signal, from_signal_fn, from_value_fn};
    use crate::steps::Steps;

    fn counting(counter: &Arc<AtomicUsize>) -> BoxedMiddleware {
        let counter = Arc::clone(counter);
        from_value_fn(move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn configure_requires_middleware() {
        let mut engine = Engine::new(EngineConfig::default());

        let err = engine.configure("save", Steps::new()).unwrap_err();
        assert_eq!(err, RegisterError::EmptyHandler("save".into()));

        let err = engine
            .configure("save", Steps::new().maybe(None).maybe(None))
            .unwrap_err();
        assert_eq!(err, RegisterError::EmptyHandler("save".into()));

        assert!(!engine.is_configured("save"));
    }

    #[test]
    fn configure_replaces_wholesale() {
        let mut engine = Engine::new(EngineConfig::default());

        engine
            .configure("save", vec![from_value_fn(|_ctx| ()), from_value_fn(|_ctx| ())])
            .unwrap();
        assert!(engine.is_configured("save"));

        // Reconfiguring replaces the old sequence rather than appending.
        engine.configure("save", from_value_fn(|_ctx| ())).unwrap();
        assert_eq!(engine.handlers["save"].len(), 1);
    }

    #[test]
    fn use_accumulates() {
        let mut engine = Engine::new(EngineConfig::default());

        assert_eq!(engine.use_(Steps::new()).unwrap_err(), RegisterError::EmptyMiddleware);

        engine.use_(from_value_fn(|_ctx| ())).unwrap();
        engine
            .use_(vec![from_value_fn(|_ctx| ()), from_value_fn(|_ctx| ())])
            .unwrap();
        assert_eq!(engine.middleware.len(), 3);
    }

    #[tokio::test]
    async fn execute_middleware_runs_in_registration_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let probe = |tag: &'static str| {
            let order = Arc::clone(&order);
            from_value_fn(move |_ctx| order.lock().push(tag))
        };

        let mut engine = Engine::new(EngineConfig::default());
        engine.use_(probe("first")).unwrap();
        engine.use_([probe("second"), probe("third")]).unwrap();

        engine.execute_middleware(json!(0), vec![]).await.unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn execute_middleware_on_empty_list_resolves() {
        let engine = Engine::new(EngineConfig::default());
        let result = engine.execute_middleware(json!(0), vec![]).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn unknown_handler_is_strict_by_default() {
        let engine = Engine::new(EngineConfig::default());
        let err = engine
            .execute_handler("missing", json!(0), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnconfiguredHandler(id) if id == "missing"));
    }

    #[tokio::test]
    async fn unknown_handler_is_ignored_when_lenient() {
        let ran = Arc::new(AtomicUsize::new(0));
        let mut engine = Engine::new(EngineConfig {
            strict_handlers: false,
            ..EngineConfig::default()
        });
        engine.configure("other", counting(&ran)).unwrap();

        let result = engine
            .execute_handler("missing", json!(0), vec![])
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    /// The canonical two-step scenario: step one signals `1`, step two sees
    /// it as the previous result and signals `2`; the chain resolves to `2`.
    #[tokio::test]
    async fn chained_results_flow_between_handler_steps() {
        let mut engine = Engine::new(EngineConfig {
            chain_results: true,
            ..EngineConfig::default()
        });

        engine
            .configure(
                "save",
                Steps::new()
                    .then(from_signal_fn(|_ctx, signal: Signal| async move {
                        signal.next(json!(1));
                    }))
                    .then(from_signal_fn(|ctx: StepContext, signal: Signal| async move {
                        assert_eq!(ctx.previous, Some(json!(1)));
                        signal.next(json!(2));
                    })),
            )
            .unwrap();

        let result = engine
            .execute_handler("save", json!("record"), vec![])
            .await
            .unwrap();
        assert_eq!(result, Some(json!(2)));
    }

    #[tokio::test]
    async fn handler_chains_are_independent_of_the_middleware_list() {
        let handler_runs = Arc::new(AtomicUsize::new(0));
        let middleware_runs = Arc::new(AtomicUsize::new(0));

        let mut engine = Engine::new(EngineConfig::default());
        engine.configure("save", counting(&handler_runs)).unwrap();
        engine.use_(counting(&middleware_runs)).unwrap();

        engine.execute_handler("save", json!(0), vec![]).await.unwrap();
        assert_eq!(handler_runs.load(Ordering::SeqCst), 1);
        assert_eq!(middleware_runs.load(Ordering::SeqCst), 0);

        engine.execute_middleware(json!(0), vec![]).await.unwrap();
        assert_eq!(middleware_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_chains_share_one_engine() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut engine = Engine::new(EngineConfig::default());
        engine.configure("save", counting(&runs)).unwrap();

        let engine = Arc::new(engine);
        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.execute_handler("save", json!(i), vec![]).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[cfg(feature = "inject")]
    mod inject {
        use super::*;

        #[test]
        fn satisfaction_tracks_requires_and_inject() {
            let mut engine = Engine::new(EngineConfig::default());
            assert!(engine.requires().is_empty());
            assert!(engine.are_dependencies_satisfied());

            engine.require("database");
            assert_eq!(engine.requires(), ["database"]);
            assert!(!engine.are_dependencies_satisfied());
            assert!(!engine.has_dependency("database"));

            engine.inject("database", "sqlite://memory".to_string());
            assert!(engine.has_dependency("database"));
            assert!(engine.are_dependencies_satisfied());
        }

        #[test]
        fn strict_lookup_fails_fast() {
            let engine = Engine::new(EngineConfig::default());
            let err = engine.dependency("database").unwrap_err();
            assert!(matches!(err, EngineError::MissingDependency(key) if key == "database"));
        }

        #[test]
        fn lenient_lookup_returns_none() {
            let engine = Engine::new(EngineConfig {
                strict_dependencies: false,
                ..EngineConfig::default()
            });
            assert!(engine.dependency("database").unwrap().is_none());
        }

        #[test]
        fn typed_lookup_downcasts() {
            let mut engine = Engine::new(EngineConfig::default());
            engine.inject("retries", 3_u32);

            let retries = engine.dependency_as::<u32>("retries").unwrap().unwrap();
            assert_eq!(*retries, 3);

            // Wrong type: the value exists but the downcast misses.
            assert!(engine.dependency_as::<String>("retries").unwrap().is_none());
        }
    }
}
