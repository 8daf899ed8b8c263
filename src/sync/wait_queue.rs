// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Wait Channel
//!
//! This module provides named wait channels for the Rustux kernel.
//! Wait channels are used by the blocking primitives to manage threads
//! that are suspended waiting for an event.
//!
//! # Design
//!
//! - **Atomic release-and-sleep**: a waiter is queued while the caller's
//!   spinlock is still held, so a wakeup issued under that spinlock can
//!   never be missed
//! - **Multiple waiters**: wake one or wake all
//! - **No fairness guarantee**: waiters are popped in queue order, but no
//!   ordering is promised to callers
//!
//! # Usage
//!
//! ```no_run
//! use rustux_sync::sync::{SpinMutex, WaitChannel};
//!
//! let state = SpinMutex::new(false);
//! let wchan = WaitChannel::new("example").unwrap();
//!
//! let mut guard = state.lock();
//! while !*guard {
//!     // Releases `state`, sleeps, reacquires `state`.
//!     guard = wchan.sleep(guard);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::err::{Result, SyncError};
use crate::sync::spin::{SpinMutex, SpinMutexGuard};
use crate::thread::{self, Waiter};

/// Magic number for wait channel validation
const WAIT_CHANNEL_MAGIC: u32 = 0x57414954; // "WAIT" in hex

/// Initial waiter queue capacity reserved at creation
const INITIAL_WAITERS: usize = 8;

/// Wait channel
///
/// Manages threads suspended waiting for a condition to become true.
pub struct WaitChannel {
    /// Channel name, for diagnostics
    name: String,

    /// Queue of waiting threads
    queue: SpinMutex<VecDeque<Arc<Waiter>>>,

    /// Magic number for validation
    magic: u32,

    /// Number of threads currently waiting
    count: AtomicUsize,
}

impl WaitChannel {
    /// Create a new wait channel.
    ///
    /// Fails with [`SyncError::NoMemory`] if the name or the waiter queue
    /// cannot be allocated.
    pub fn new(name: &str) -> Result<Self> {
        let name = crate::sync::dup_name(name)?;
        let mut queue = VecDeque::new();
        queue
            .try_reserve(INITIAL_WAITERS)
            .map_err(|_| SyncError::NoMemory)?;

        Ok(Self {
            name,
            queue: SpinMutex::new(queue),
            magic: WAIT_CHANNEL_MAGIC,
            count: AtomicUsize::new(0),
        })
    }

    /// Get the channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Atomically release `guard` and suspend the calling thread.
    ///
    /// The waiter is queued before `guard` is released, so a `wake_one` or
    /// `wake_all` issued by a thread that acquires the same spinlock cannot
    /// slip in between. Returns a fresh guard on the same spinlock; the
    /// caller must re-check its condition, since being woken is a hint, not
    /// a guarantee.
    ///
    /// Panics if called from interrupt context.
    pub fn sleep<'a, T>(&self, guard: SpinMutexGuard<'a, T>) -> SpinMutexGuard<'a, T> {
        self.validate();
        assert!(
            !thread::in_interrupt(),
            "wait_channel_sleep: cannot sleep in interrupt context ('{}')",
            self.name
        );

        let waiter = Waiter::current();
        self.queue.lock().push_back(Arc::clone(&waiter));
        self.count.fetch_add(1, Ordering::Release);

        log::trace!("thread {} sleeping on '{}'", waiter.tid(), self.name);

        let lock = SpinMutexGuard::unlock(guard);
        waiter.block();
        lock.lock()
    }

    /// Wake one thread from the wait channel
    ///
    /// Returns the number of threads woken (0 or 1).
    pub fn wake_one(&self) -> usize {
        self.validate();
        self.wake(1)
    }

    /// Wake all threads from the wait channel
    ///
    /// Returns the number of threads woken.
    pub fn wake_all(&self) -> usize {
        self.validate();
        self.wake(usize::MAX)
    }

    /// Check if the wait channel is empty
    pub fn is_empty(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }

    /// Get the number of waiting threads
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Destroy the wait channel
    ///
    /// Panics if there are threads still waiting.
    pub fn destroy(self) {
        self.check_unused();
    }

    /// Internal wake implementation
    fn wake(&self, max: usize) -> usize {
        let mut woken = 0;

        while woken < max {
            let waiter = self.queue.lock().pop_front();
            match waiter {
                Some(waiter) => {
                    self.count.fetch_sub(1, Ordering::Release);
                    log::trace!("waking thread {} on '{}'", waiter.tid(), self.name);
                    waiter.wake();
                    woken += 1;
                }
                None => break,
            }
        }

        woken
    }

    fn check_unused(&self) {
        if !self.is_empty() {
            panic!(
                "wait_channel_destroy: threads still waiting on '{}'",
                self.name
            );
        }
    }

    /// Validate that this is a valid wait channel
    fn validate(&self) {
        debug_assert_eq!(self.magic, WAIT_CHANNEL_MAGIC, "invalid wait channel magic");
    }
}

impl Drop for WaitChannel {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            self.check_unused();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
