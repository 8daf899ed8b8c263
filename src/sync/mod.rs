// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! This module provides the core synchronization primitives of the Rustux
//! threading subsystem.
//!
//! # Primitives
//!
//! - **SpinMutex**: busy-wait mutual exclusion for short critical sections
//! - **WaitChannel**: named sleep/wake queue with an atomic
//!   release-and-sleep contract
//! - **Semaphore**: counting resource gate
//! - **Lock**: sleeping mutual exclusion with ownership tracking
//! - **CondVar**: wait/signal/broadcast against an externally held Lock
//! - **RwLock**: many readers or one writer, with burst reader admission
//!   on writer release
//!
//! # Design
//!
//! Every primitive mutates its state only while its own spinlock is held,
//! and suspends only inside [`WaitChannel::sleep`], which releases that
//! spinlock and reacquires it around the park. Wakeup ordering is best
//! effort throughout; the only promises are the RwLock's burst reader
//! wake and one-writer-at-a-time admission.
//!
//! [`WaitChannel::sleep`]: wait_queue::WaitChannel::sleep

pub mod condvar;
pub mod lock;
pub mod rwlock;
pub mod semaphore;
pub mod spin;
pub mod wait_queue;

// Re-exports
pub use condvar::CondVar;
pub use lock::Lock;
pub use rwlock::{RwLock, MAX_READERS};
pub use semaphore::Semaphore;
pub use spin::{SpinMutex, SpinMutexGuard};
pub use wait_queue::WaitChannel;

use crate::err::{Result, SyncError};

/// Duplicate a primitive name, surfacing allocation failure instead of
/// aborting.
pub(crate) fn dup_name(name: &str) -> Result<String> {
    let mut owned = String::new();
    owned
        .try_reserve(name.len())
        .map_err(|_| SyncError::NoMemory)?;
    owned.push_str(name);
    Ok(owned)
}
