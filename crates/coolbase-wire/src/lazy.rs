//! Once-computed lazy fields.
//!
//! Derived values (a version parsed out of a header, a recovered signer) are
//! computed at most once per context instance. Failures are sticky: the
//! first error is cached and replayed on every later access, so a context
//! never half-retries a read that already corrupted its position.

use crate::error::WireError;

/// A value computed at most once, caching success and failure alike.
#[derive(Debug, Default)]
pub struct Lazy<T> {
    state: Option<Result<T, WireError>>,
}

impl<T> Lazy<T> {
    /// An unset cell.
    pub const fn new() -> Self {
        Self { state: None }
    }

    /// True once the cell holds an outcome (either way).
    pub fn is_set(&self) -> bool {
        self.state.is_some()
    }

    /// The cached value, if the computation has succeeded.
    pub fn ready(&self) -> Option<&T> {
        match &self.state {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// The cached outcome, if set, replaying a cached error.
    pub fn outcome(&self) -> Option<Result<&T, WireError>> {
        self.state
            .as_ref()
            .map(|result| result.as_ref().map_err(Clone::clone))
    }

    /// Get the value, running `init` if the cell is unset.
    ///
    /// A failed `init` is cached; later calls replay the same error without
    /// re-running anything.
    pub fn get_or_try_init(
        &mut self,
        init: impl FnOnce() -> Result<T, WireError>,
    ) -> Result<&T, WireError> {
        match self.state.get_or_insert_with(init) {
            Ok(value) => Ok(value),
            Err(e) => Err(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_computes_once() {
        let mut cell = Lazy::new();
        let mut calls = 0;
        for _ in 0..3 {
            let value = cell
                .get_or_try_init(|| {
                    calls += 1;
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls, 1);
        assert_eq!(cell.ready(), Some(&42));
    }

    #[test]
    fn test_failure_is_sticky() {
        let mut cell: Lazy<u32> = Lazy::new();
        let first = cell.get_or_try_init(|| Err(WireError::ContextClosed));
        assert_eq!(first.unwrap_err(), WireError::ContextClosed);

        // The second init closure must not run.
        let second = cell.get_or_try_init(|| Ok(7));
        assert_eq!(second.unwrap_err(), WireError::ContextClosed);
        assert!(cell.is_set());
        assert_eq!(cell.ready(), None);
    }
}
