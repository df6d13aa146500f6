//! Ordered middleware sequences and the registration input trait.

use std::fmt;

use crate::middleware::BoxedMiddleware;

/// An ordered sequence of middleware, built before registration.
///
/// Optional entries are expressed with [`maybe`](Self::maybe), which drops
/// `None` silently — registration then rejects sequences that end up empty.
///
/// ```rust,ignore
/// engine.configure(
///     "save",
///     Steps::new()
///         .then(validate)
///         .maybe(config.audit.then(|| audit_middleware()))
///         .then(persist),
/// )?;
/// ```
#[derive(Default, Clone)]
pub struct Steps {
    entries: Vec<BoxedMiddleware>,
}

impl Steps {
    /// Creates an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware to the end of the sequence.
    pub fn then(mut self, middleware: BoxedMiddleware) -> Self {
        self.entries.push(middleware);
        self
    }

    /// Appends when `Some`; drops `None` without error.
    pub fn maybe(self, middleware: Option<BoxedMiddleware>) -> Self {
        match middleware {
            Some(middleware) => self.then(middleware),
            None => self,
        }
    }

    /// Number of middleware in the sequence.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sequence holds no middleware at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<BoxedMiddleware> {
        self.entries
    }
}

impl fmt::Debug for Steps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Steps").field("len", &self.len()).finish()
    }
}

impl FromIterator<BoxedMiddleware> for Steps {
    fn from_iter<I: IntoIterator<Item = BoxedMiddleware>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<BoxedMiddleware> for Steps {
    fn extend<I: IntoIterator<Item = BoxedMiddleware>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

/// Anything `configure` and `use_` accept as a middleware sequence.
pub trait IntoSteps {
    /// Convert into an ordered sequence.
    fn into_steps(self) -> Steps;
}

impl IntoSteps for Steps {
    fn into_steps(self) -> Steps {
        self
    }
}

impl IntoSteps for BoxedMiddleware {
    fn into_steps(self) -> Steps {
        Steps::new().then(self)
    }
}

/// `None` converts to an empty sequence, which registration then rejects.
impl IntoSteps for Option<BoxedMiddleware> {
    fn into_steps(self) -> Steps {
        Steps::new().maybe(self)
    }
}

impl IntoSteps for Vec<BoxedMiddleware> {
    fn into_steps(self) -> Steps {
        self.into_iter().collect()
    }
}

impl<const N: usize> IntoSteps for [BoxedMiddleware; N] {
    fn into_steps(self) -> Steps {
        self.into_iter().collect()
    }
}

impl<const N: usize> IntoSteps for [Option<BoxedMiddleware>; N] {
    fn into_steps(self) -> Steps {
        self.into_iter()
            .fold(Steps::new(), |steps, entry| steps.maybe(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_value_fn;

    fn noop() -> BoxedMiddleware {
        from_value_fn(|_ctx| ())
    }

    #[test]
    fn maybe_drops_none() {
        let steps = Steps::new().then(noop()).maybe(None).maybe(Some(noop()));
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn empty_inputs_stay_empty() {
        assert!(Steps::new().is_empty());
        assert!(None::<BoxedMiddleware>.into_steps().is_empty());
        assert!([None::<BoxedMiddleware>, None].into_steps().is_empty());
        assert!(Vec::<BoxedMiddleware>::new().into_steps().is_empty());
    }

    #[test]
    fn conversions_preserve_order_and_count() {
        assert_eq!(noop().into_steps().len(), 1);
        assert_eq!(vec![noop(), noop()].into_steps().len(), 2);
        assert_eq!([noop(), noop(), noop()].into_steps().len(), 3);
        assert_eq!([Some(noop()), None, Some(noop())].into_steps().len(), 2);
    }
}
