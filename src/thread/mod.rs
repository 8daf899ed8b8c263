// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Thread Identity and Parking
//!
//! This module provides the scheduler-facing surface the synchronization
//! primitives depend on: current-thread identity, the interrupt-context
//! flag, and the suspend/resume handle used by wait channels.
//!
//! # Design
//!
//! - Each thread has a unique thread ID (TID), handed out lazily from a
//!   global allocator the first time the thread touches a primitive
//! - The interrupt-context flag is per-thread; blocking primitives panic
//!   when it is set
//! - [`Waiter`] is a one-shot park handle: a thread creates one for itself,
//!   a wait channel hands it to whoever will wake the thread, and the
//!   wake-before-block race is absorbed by a woken flag
//!
//! # Usage
//!
//! ```rust
//! use rustux_sync::thread;
//!
//! let tid = thread::current_tid();
//! assert!(!thread::in_interrupt());
//! ```

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::Thread;

/// ============================================================================
/// Thread ID
/// ============================================================================

/// Thread ID type
pub type ThreadId = u64;

/// Invalid thread ID
pub const TID_INVALID: ThreadId = 0;

/// Global thread ID allocator
static TID_ALLOCATOR: TidAllocator = TidAllocator::new();

/// Thread ID allocator
struct TidAllocator {
    next: AtomicU64,
}

impl TidAllocator {
    const fn new() -> Self {
        Self {
            // TID 0 is reserved/invalid
            next: AtomicU64::new(1),
        }
    }

    fn allocate(&self) -> ThreadId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

thread_local! {
    static CURRENT_TID: Cell<ThreadId> = const { Cell::new(TID_INVALID) };
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
}

/// Get the current thread's ID, allocating one on first use.
pub fn current_tid() -> ThreadId {
    CURRENT_TID.with(|tid| {
        if tid.get() == TID_INVALID {
            tid.set(TID_ALLOCATOR.allocate());
        }
        tid.get()
    })
}

/// ============================================================================
/// Interrupt Context
/// ============================================================================

/// Check whether the current thread is running in interrupt context.
///
/// Blocking primitives must never be entered while this returns true.
pub fn in_interrupt() -> bool {
    IN_INTERRUPT.with(|flag| flag.get())
}

/// RAII marker for a section of code running in interrupt context.
///
/// Interrupt handlers (and tests standing in for them) hold one of these
/// for the duration of the handler; the flag is restored on drop.
pub struct InterruptGuard {
    prev: bool,
}

impl InterruptGuard {
    /// Enter interrupt context on the current thread.
    pub fn enter() -> Self {
        let prev = IN_INTERRUPT.with(|flag| flag.replace(true));
        Self { prev }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        let prev = self.prev;
        IN_INTERRUPT.with(|flag| flag.set(prev));
    }
}

/// ============================================================================
/// Waiter
/// ============================================================================

/// One-shot park handle for the current thread.
///
/// The owning thread calls [`block`]; the thread that dequeues the handle
/// from a wait channel calls [`wake`]. A wake that arrives before the
/// block does not get lost: the woken flag is checked before every park.
///
/// [`block`]: Waiter::block
/// [`wake`]: Waiter::wake
pub struct Waiter {
    /// Handle used to unpark the blocked thread
    thread: Thread,

    /// Set by the waker; guards against spurious and early unparks
    woken: AtomicBool,

    /// TID of the blocked thread, for logging
    tid: ThreadId,
}

impl Waiter {
    /// Create a park handle for the calling thread.
    pub fn current() -> Arc<Self> {
        Arc::new(Self {
            thread: std::thread::current(),
            woken: AtomicBool::new(false),
            tid: current_tid(),
        })
    }

    /// Park the calling thread until [`wake`] is called.
    ///
    /// Must only be called by the thread that created this handle.
    ///
    /// [`wake`]: Waiter::wake
    pub fn block(&self) {
        while !self.woken.load(Ordering::Acquire) {
            std::thread::park();
        }
    }

    /// Wake the blocked thread.
    pub fn wake(&self) {
        self.woken.store(true, Ordering::Release);
        self.thread.unpark();
    }

    /// TID of the thread this handle belongs to.
    pub fn tid(&self) -> ThreadId {
        self.tid
    }
}

// ============================================================================
// Tests
// ============================================================================
