//! Lock/condition primitive
//!
//! One mutex paired with one condition variable, so that every component
//! needing predicate waits shares a single tested implementation instead of
//! re-deriving lock/condition handling per use site.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A mutex-protected state with an attached condition variable
pub(crate) struct Monitor<T> {
    state: Mutex<T>,
    condvar: Condvar,
}

impl<T> Monitor<T> {
    pub fn new(initial: T) -> Self {
        Monitor {
            state: Mutex::new(initial),
            condvar: Condvar::new(),
        }
    }

    /// Acquire the lock, recovering the state if a holder panicked
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while `condition` holds, releasing the lock during the wait
    pub fn wait_while<'a, F>(
        &self,
        guard: MutexGuard<'a, T>,
        condition: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.condvar
            .wait_while(guard, condition)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake every thread blocked in [`wait_while`](Self::wait_while)
    pub fn notify_all(&self) {
        self.condvar.notify_all();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
