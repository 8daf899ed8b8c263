// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Error Types
//!
//! This module provides the error type used by the synchronization
//! primitives. Only resource exhaustion during creation is recoverable;
//! every other contract breach is a programming error and panics.

use core::fmt;

/// Errors returned by primitive constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// Allocation of a name or waiter queue failed.
    NoMemory,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::NoMemory => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for SyncError {}

/// Result type for primitive creation.
pub type Result<T> = core::result::Result<T, SyncError>;
