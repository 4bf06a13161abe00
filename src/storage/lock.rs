//! In-process lock around the backing file
//!
//! Serializes read/copy/write of one file between threads of this process.
//! It does not protect against other processes.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::CaseError;

/// Shared lock handle; clones guard the same file
#[derive(Debug, Clone, Default)]
pub struct FileLock(Arc<Mutex<()>>);

impl FileLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is held
    pub fn acquire(&self) -> Result<MutexGuard<'_, ()>, CaseError> {
        self.0
            .lock()
            .map_err(|e| CaseError::Storage(format!("Failed to acquire file lock: {}", e)))
    }

    /// Whether two handles guard the same file
    pub fn shares_with(&self, other: &FileLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
