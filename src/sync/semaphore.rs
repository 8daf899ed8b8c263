// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Counting Semaphore
//!
//! This module provides counting semaphores for the Rustux kernel.
//! A semaphore gates access to a finite set of resources: `down` takes a
//! unit (blocking while none are available) and `up` returns one.
//!
//! # Design
//!
//! - The count is mutated only under the semaphore's spinlock, which also
//!   serializes the wait channel
//! - A woken `down` re-checks the count in a loop; wakeup is a hint, not a
//!   handoff, so no strict FIFO ordering is guaranteed among waiters
//! - `down` from interrupt context is fatal, checked even when the count
//!   would allow completion without blocking

use crate::err::Result;
use crate::sync::spin::SpinMutex;
use crate::sync::wait_queue::WaitChannel;
use crate::thread;

/// Counting semaphore
pub struct Semaphore {
    /// Semaphore name, for diagnostics
    name: String,

    /// Threads blocked in `down`
    wchan: WaitChannel,

    /// Available units, guarded by the semaphore spinlock
    count: SpinMutex<usize>,
}

impl Semaphore {
    /// Create a new semaphore with `initial` units available.
    ///
    /// Fails with [`SyncError::NoMemory`] if the name or wait channel
    /// cannot be allocated; partial allocations are released on the way
    /// out.
    ///
    /// [`SyncError::NoMemory`]: crate::err::SyncError::NoMemory
    pub fn create(name: &str, initial: usize) -> Result<Self> {
        let name = crate::sync::dup_name(name)?;
        let wchan = WaitChannel::new(&name)?;

        Ok(Self {
            name,
            wchan,
            count: SpinMutex::new(initial),
        })
    }

    /// Get the semaphore name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take one unit, blocking until one is available (P).
    ///
    /// Panics if called from interrupt context.
    pub fn down(&self) {
        // May not block in an interrupt handler. Always checked, even if
        // the down could complete without blocking.
        assert!(
            !thread::in_interrupt(),
            "semaphore_down: cannot block in interrupt context ('{}')",
            self.name
        );

        let mut guard = self.count.lock();
        while *guard == 0 {
            guard = self.wchan.sleep(guard);
        }
        *guard -= 1;
    }

    /// Return one unit and wake at most one waiter (V).
    ///
    /// Panics if the count would wrap around.
    pub fn up(&self) {
        let mut guard = self.count.lock();
        *guard = guard
            .checked_add(1)
            .unwrap_or_else(|| panic!("semaphore_up: count overflow on '{}'", self.name));
        self.wchan.wake_one();
    }

    /// Snapshot of the current count.
    ///
    /// Only meaningful as a hint without external synchronization.
    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Destroy the semaphore
    ///
    /// Panics if any thread is blocked in `down`.
    pub fn destroy(self) {
        self.check_unused();
    }

    fn check_unused(&self) {
        if !self.wchan.is_empty() {
            panic!(
                "semaphore_destroy: threads still waiting on '{}'",
                self.name
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.wchan.len()
    }
}

impl Drop for Semaphore {
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_semaphore_create() {
        let sem = Semaphore::create("test", 3).unwrap();
        assert_eq!(sem.name(), "test");
        assert_eq!(sem.count(), 3);
        sem.destroy();
    }

    #[test]
    fn test_down_without_blocking() {
        let sem = Semaphore::create("nb", 2).unwrap();
        sem.down();
        sem.down();
        assert_eq!(sem.count(), 0);
        sem.up();
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn test_down_blocks_until_up() {
        let sem = Arc::new(Semaphore::create("block", 0).unwrap());
        let passed = Arc::new(AtomicUsize::new(0));

        let sem2 = Arc::clone(&sem);
        let passed2 = Arc::clone(&passed);
        let handle = std::thread::spawn(move || {
            sem2.down();
            passed2.fetch_add(1, Ordering::SeqCst);
        });

        // The downer must actually block.
        while sem.waiters() == 0 {
            std::thread::yield_now();
        }
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(passed.load(Ordering::SeqCst), 0);

        sem.up();
        handle.join().unwrap();
        assert_eq!(passed.load(Ordering::SeqCst), 1);
        assert_eq!(sem.count(), 0);
    }

    #[test]
    #[should_panic(expected = "cannot block in interrupt context")]
    fn test_down_in_interrupt_context_panics() {
        let sem = Semaphore::create("irq", 1).unwrap();
        let _irq = thread::InterruptGuard::enter();
        sem.down();
    }

    #[test]
    #[should_panic(expected = "count overflow")]
    fn test_up_overflow_panics() {
        let sem = Semaphore::create("wrap", usize::MAX).unwrap();
        sem.up();
    }

    #[test]
    #[should_panic(expected = "semaphore_destroy: threads still waiting")]
    fn test_destroy_with_blocked_waiter_panics() {
        let sem = Semaphore::create("doomed", 0).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| sem.down());
            while sem.waiters() == 0 {
                std::thread::yield_now();
            }

            let err = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                sem.check_unused();
            }))
            .unwrap_err();

            // Let the waiter out so the scope can join it, then let the
            // destroy panic continue.
            sem.up();
            std::panic::resume_unwind(err);
        });
    }
}
