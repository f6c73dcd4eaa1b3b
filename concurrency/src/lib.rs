// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Concurrency primitives shared across the path protection engine.
//!
//! The per-EVC mutex discipline in the design (§5) requires every entry point — the deployer,
//! the link-down pipeline, the consistency loop — to attempt its mutation non-blockingly and skip
//! the EVC for this tick if it is already busy. [`TryLock`] is the single seam through which that
//! discipline is applied, so that no call site reaches for a blocking `lock()` by accident.

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

pub use std::sync;

use parking_lot::Mutex;

/// A mutex that is only ever acquired with `try_lock`.
///
/// Wraps `parking_lot::Mutex` rather than exposing it directly so that a blocking `lock()` call
/// cannot be introduced at a call site by accident; if a caller needs a blocking wait it should
/// be explicit about that instead of reaching for this type.
#[derive(Debug, Default)]
pub struct TryLock<T> {
    inner: Mutex<T>,
}

impl<T> TryLock<T> {
    /// Wrap a value behind a try-lock-only mutex.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Attempt to acquire the lock without blocking.
    ///
    /// Returns `None` if the lock is already held, which callers should treat as "skip this
    /// resource for the current tick", never as an error.
    pub fn try_lock(&self) -> Option<parking_lot::MutexGuard<'_, T>> {
        self.inner.try_lock()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::TryLock;

    #[test]
    fn try_lock_excludes_concurrent_holders() {
        let lock = TryLock::new(0_i32);
        let guard = lock.try_lock().expect("uncontended lock must succeed");
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn try_lock_allows_mutation() {
        let lock = TryLock::new(vec![1, 2, 3]);
        {
            let mut guard = lock.try_lock().expect("uncontended lock must succeed");
            guard.push(4);
        }
        assert_eq!(*lock.try_lock().unwrap(), vec![1, 2, 3, 4]);
    }
}
