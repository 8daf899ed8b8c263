// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Rustux Synchronization Core
//!
//! Synchronization primitives for the Rustux kernel threading subsystem:
//! counting semaphores, mutual-exclusion locks, condition variables, and
//! reader-writer locks, built on a named wait channel and a busy-wait
//! spinlock.
//!
//! The crate is built as a hosted library so the primitives run under
//! true concurrent execution in the test suite; the scheduler surface the
//! primitives need (thread identity, interrupt-context flag, park/unpark)
//! lives in [`thread`].
//!
//! # Contract summary
//!
//! - Creation can fail with [`SyncError::NoMemory`]; every other failure
//!   is a protocol violation and panics
//! - Blocking from interrupt context is fatal
//! - Destroying a primitive with waiters or holders is fatal
//! - Wakeup ordering is best effort; no FIFO fairness is promised
//!
//! [`SyncError::NoMemory`]: err::SyncError::NoMemory

pub mod err;
pub mod lockdep;
pub mod sync;
pub mod thread;

pub use err::{Result, SyncError};
pub use sync::{CondVar, Lock, RwLock, Semaphore, SpinMutex, WaitChannel};
