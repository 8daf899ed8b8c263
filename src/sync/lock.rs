// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Lock
//!
//! This module provides the sleeping mutual-exclusion lock for the Rustux
//! kernel.
//!
//! # Design
//!
//! - **Ownership tracking**: the lock records which thread holds it, and
//!   releasing a lock the caller does not own is fatal
//! - **Blocks instead of spinning**: contended acquirers sleep on a wait
//!   channel; the internal spinlock only covers the state flip
//! - **Lockdep hooks**: waiting/acquired/released events are emitted for
//!   an attached deadlock observer
//!
//! # Usage
//!
//! ```rust
//! use rustux_sync::sync::Lock;
//!
//! let lock = Lock::create("example").unwrap();
//!
//! lock.acquire();
//! // Critical section
//! lock.release();
//!
//! lock.destroy();
//! ```

use crate::err::Result;
use crate::lockdep::{self, LockClassId};
use crate::sync::spin::SpinMutex;
use crate::sync::wait_queue::WaitChannel;
use crate::thread::{self, ThreadId};

/// Lock state, guarded by the lock's spinlock.
///
/// Invariant: `held == owner.is_some()`.
struct LockState {
    held: bool,
    owner: Option<ThreadId>,
}

/// Sleeping mutual-exclusion lock with ownership tracking
pub struct Lock {
    /// Lock name, for diagnostics
    name: String,

    /// Threads blocked in `acquire`
    wchan: WaitChannel,

    /// Held flag and owner, guarded by the lock spinlock
    state: SpinMutex<LockState>,

    /// Lockdep class for instrumentation events
    class: LockClassId,
}

impl Lock {
    /// Create a new lock in the unlocked state.
    pub fn create(name: &str) -> Result<Self> {
        let name = crate::sync::dup_name(name)?;
        let wchan = WaitChannel::new(&name)?;
        let class = lockdep::register_class(&name);

        Ok(Self {
            name,
            wchan,
            state: SpinMutex::new(LockState {
                held: false,
                owner: None,
            }),
            class,
        })
    }

    /// Get the lock name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the lock, blocking until it is available.
    ///
    /// Acquiring a lock the caller already holds deadlocks; the lock is
    /// not reentrant.
    pub fn acquire(&self) {
        let tid = thread::current_tid();

        let mut guard = self.state.lock();
        lockdep::notify_waiting(tid, self.class);

        while guard.held {
            guard = self.wchan.sleep(guard);
        }

        guard.held = true;
        guard.owner = Some(tid);
        lockdep::notify_acquired(tid, self.class);
    }

    /// Release the lock and wake one waiter.
    ///
    /// Panics if the calling thread does not hold the lock.
    pub fn release(&self) {
        assert!(
            self.held_by_current(),
            "lock_release: thread tried to release lock '{}' it doesn't own",
            self.name
        );

        let mut guard = self.state.lock();
        guard.held = false;
        guard.owner = None;
        lockdep::notify_released(thread::current_tid(), self.class);
        self.wchan.wake_one();
        drop(guard);
    }

    /// Check whether the calling thread holds the lock.
    ///
    /// The result is a snapshot; without external synchronization it may
    /// be stale by the time the caller acts on it.
    pub fn held_by_current(&self) -> bool {
        let guard = self.state.lock();
        guard.held && guard.owner == Some(thread::current_tid())
    }

    /// Destroy the lock
    ///
    /// Panics if the lock is currently held.
    pub fn destroy(self) {
        self.check_unused();
    }

    fn check_unused(&self) {
        if self.state.lock().held {
            panic!("lock_destroy: tried to destroy held lock '{}'", self.name);
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.check_unused();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_lock_create() {
        let lock = Lock::create("test").unwrap();
        assert!(!lock.held_by_current());
        lock.destroy();
    }

    #[test]
    fn test_acquire_release() {
        let lock = Lock::create("ar").unwrap();

        lock.acquire();
        assert!(lock.held_by_current());
        lock.release();
        assert!(!lock.held_by_current());

        lock.destroy();
    }

    #[test]
    fn test_held_by_other_thread_is_not_held_by_current() {
        let lock = Arc::new(Lock::create("other").unwrap());
        lock.acquire();

        let lock2 = Arc::clone(&lock);
        std::thread::spawn(move || {
            assert!(!lock2.held_by_current());
        })
        .join()
        .unwrap();

        lock.release();
    }

    #[test]
    fn test_contended_acquire_blocks() {
        let lock = Arc::new(Lock::create("contended").unwrap());
        let acquired = Arc::new(AtomicBool::new(false));

        lock.acquire();

        let lock2 = Arc::clone(&lock);
        let acquired2 = Arc::clone(&acquired);
        let handle = std::thread::spawn(move || {
            lock2.acquire();
            acquired2.store(true, Ordering::SeqCst);
            lock2.release();
        });

        std::thread::sleep(Duration::from_millis(20));
        assert!(!acquired.load(Ordering::SeqCst), "second acquire must block");

        lock.release();
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "doesn't own")]
    fn test_release_unheld_lock_panics() {
        let lock = Lock::create("unheld").unwrap();
        lock.release();
    }

    #[test]
    #[should_panic(expected = "doesn't own")]
    fn test_release_from_non_owner_panics() {
        let lock = Arc::new(Lock::create("wrong_owner").unwrap());
        let lock2 = Arc::clone(&lock);
        std::thread::spawn(move || lock2.acquire()).join().unwrap();
        lock.release();
    }

    #[test]
    #[should_panic(expected = "tried to destroy held lock")]
    fn test_destroy_held_lock_panics() {
        let lock = Lock::create("held").unwrap();
        lock.acquire();
        lock.destroy();
    }
}
