// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Lock Dependency Instrumentation
//!
//! This module provides the hook surface for deadlock-detection tooling.
//! Each lock-like primitive registers a lock class at creation and emits
//! waiting/acquired/released events against it. Classes are keyed by
//! name, so primitives sharing a name share a class and lock churn never
//! grows the registry. The detector itself is an optional injected
//! observer; with none attached the hooks are no-ops, so the core runs
//! identically with or without instrumentation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use spin::Mutex;

use crate::thread::ThreadId;

/// Maximum number of lock classes
const MAX_LOCK_CLASSES: usize = 256;

/// Lock class ID type
pub type LockClassId = u16;

/// Global lock class registry
static LOCK_CLASSES: Mutex<BTreeMap<LockClassId, String>> = Mutex::new(BTreeMap::new());

/// Next lock class ID
static NEXT_LOCK_CLASS_ID: AtomicUsize = AtomicUsize::new(0);

/// Attached observer, if any
static OBSERVER: Mutex<Option<Arc<dyn DeadlockObserver>>> = Mutex::new(None);

/// Observer interface for deadlock-detection tooling.
///
/// Callbacks run with the emitting primitive's spinlock held and must not
/// block or call back into the primitive.
pub trait DeadlockObserver: Send + Sync {
    /// The thread is about to block waiting for the lock class.
    fn waiting(&self, tid: ThreadId, class: LockClassId);

    /// The thread now holds the lock class.
    fn acquired(&self, tid: ThreadId, class: LockClassId);

    /// The thread released the lock class.
    fn released(&self, tid: ThreadId, class: LockClassId);
}

/// Register a lock class
///
/// Classes are keyed by name: registering a name that already has a class
/// returns the existing ID, so creating and destroying primitives never
/// consumes new slots. The registry is bounded by the number of distinct
/// class names, and exceeding that bound is fatal.
///
/// # Arguments
///
/// * `name` - Lock class name
///
/// # Returns
///
/// Lock class ID
pub fn register_class(name: &str) -> LockClassId {
    let mut classes = LOCK_CLASSES.lock();
    if let Some((&id, _)) = classes.iter().find(|(_, n)| n.as_str() == name) {
        return id;
    }

    let id = NEXT_LOCK_CLASS_ID.fetch_add(1, Ordering::AcqRel);
    if id >= MAX_LOCK_CLASSES {
        panic!("lockdep: too many lock classes registered");
    }
    let id = id as LockClassId;

    classes.insert(id, name.to_string());
    log::debug!("lockdep: registered lock class '{}' with ID {}", name, id);

    id
}

/// Look up the name of a registered lock class
pub fn class_name(id: LockClassId) -> Option<String> {
    LOCK_CLASSES.lock().get(&id).cloned()
}

/// Attach a deadlock observer
pub fn set_observer(observer: Arc<dyn DeadlockObserver>) {
    *OBSERVER.lock() = Some(observer);
}

/// Detach the deadlock observer
pub fn clear_observer() {
    *OBSERVER.lock() = None;
}

fn observer() -> Option<Arc<dyn DeadlockObserver>> {
    // Clone the Arc out so user callbacks never run under the registry lock.
    OBSERVER.lock().clone()
}

pub(crate) fn notify_waiting(tid: ThreadId, class: LockClassId) {
    if let Some(observer) = observer() {
        observer.waiting(tid, class);
    }
}

pub(crate) fn notify_acquired(tid: ThreadId, class: LockClassId) {
    if let Some(observer) = observer() {
        observer.acquired(tid, class);
    }
}

pub(crate) fn notify_released(tid: ThreadId, class: LockClassId) {
    if let Some(observer) = observer() {
        observer.released(tid, class);
    }
}

// ============================================================================
// Tests
// ============================================================================
