// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Condition Variable
//!
//! This module provides condition variables for the Rustux kernel.
//! A condition variable lets a thread sleep until some state change is
//! announced by another thread, cooperating with a [`Lock`] that guards
//! the state itself.
//!
//! # Design
//!
//! - The CV holds no reference to any lock; the associated [`Lock`] is
//!   supplied on every call and must be held by the caller
//! - `wait` re-acquires the lock before returning, so the caller never
//!   observes the signaled condition without holding it
//! - `signal` and `broadcast` take the lock purely to enforce the holding
//!   invariant; they never touch its internal state
//!
//! [`Lock`]: crate::sync::lock::Lock

use crate::err::Result;
use crate::sync::lock::Lock;
use crate::sync::spin::SpinMutex;
use crate::sync::wait_queue::WaitChannel;

/// Condition variable
pub struct CondVar {
    /// CV name, for diagnostics
    name: String,

    /// Threads blocked in `wait`
    wchan: WaitChannel,

    /// Number of threads inside `wait`, guarded by the CV spinlock
    waiters: SpinMutex<usize>,
}

impl CondVar {
    /// Create a new condition variable.
    pub fn create(name: &str) -> Result<Self> {
        let name = crate::sync::dup_name(name)?;
        let wchan = WaitChannel::new(&name)?;

        Ok(Self {
            name,
            wchan,
            waiters: SpinMutex::new(0),
        })
    }

    /// Get the CV name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release `lock`, sleep until signaled, then re-acquire `lock`.
    ///
    /// Panics unless the calling thread holds `lock`. Wakeups are hints;
    /// callers re-check their predicate in a loop around `wait`.
    pub fn wait(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "cv_wait: caller does not hold lock '{}' for cv '{}'",
            lock.name(),
            self.name
        );

        lock.release();

        let mut guard = self.waiters.lock();
        *guard += 1;
        guard = self.wchan.sleep(guard);
        *guard -= 1;
        drop(guard);

        lock.acquire();
    }

    /// Wake one thread blocked in `wait`.
    ///
    /// Panics unless the calling thread holds `lock`.
    pub fn signal(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "cv_signal: caller does not hold lock '{}' for cv '{}'",
            lock.name(),
            self.name
        );

        let guard = self.waiters.lock();
        self.wchan.wake_one();
        drop(guard);
    }

    /// Wake all threads blocked in `wait`.
    ///
    /// Panics unless the calling thread holds `lock`.
    pub fn broadcast(&self, lock: &Lock) {
        assert!(
            lock.held_by_current(),
            "cv_broadcast: caller does not hold lock '{}' for cv '{}'",
            lock.name(),
            self.name
        );

        let guard = self.waiters.lock();
        self.wchan.wake_all();
        drop(guard);
    }

    /// Number of threads currently inside `wait`.
    ///
    /// Accurate while the caller holds the associated lock and the count
    /// is observed under it; otherwise a hint.
    pub fn waiters(&self) -> usize {
        *self.waiters.lock()
    }

    /// Destroy the condition variable
    ///
    /// Panics if any thread is waiting on it.
    pub fn destroy(self) {
        self.check_unused();
    }

    fn check_unused(&self) {
        if *self.waiters.lock() > 0 {
            panic!("cv_destroy: threads still waiting on '{}'", self.name);
        }
    }
}

impl Drop for CondVar {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.check_unused();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
