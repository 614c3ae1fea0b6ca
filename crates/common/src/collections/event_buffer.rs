#![forbid(unsafe_code)]

//! Fixed-capacity staging area keyed by correlation id.
//!
//! [`EventBuffer`] holds payloads between the moment a caller submits them
//! and the moment a worker picks them up.
//!
//! **Semantics**
//! - `write` never blocks and never evicts: once `capacity` entries are held
//!   it fails with [`WardenError::BufferOverflow`].
//! - `read` removes the entry. A second `read` for the same id yields `None`.
//!
//! **Thread Safety**
//! - Both operations run inside a single `parking_lot::Mutex` critical
//!   section that only performs a size check and a map mutation, so the
//!   buffer cannot deadlock against itself or its callers.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use uuid::Uuid;
use warden_domain::{Result, WardenError};

/// Bounded map from correlation id to payload.
pub struct EventBuffer<T> {
    entries: Mutex<HashMap<Uuid, T>>,
    capacity: usize,
}

impl<T> EventBuffer<T> {
    /// Create a buffer holding at most `capacity` payloads.
    ///
    /// # Errors
    /// Returns `WardenError::Config` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(WardenError::Config("event buffer capacity must be at least 1".into()));
        }
        Ok(Self { entries: Mutex::new(HashMap::with_capacity(capacity)), capacity })
    }

    /// Stage a payload and return its correlation id.
    ///
    /// # Errors
    /// Returns `WardenError::BufferOverflow` when the buffer is full.
    pub fn write(&self, payload: T) -> Result<Uuid> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(WardenError::BufferOverflow { capacity: self.capacity });
        }
        let id = loop {
            let candidate = Uuid::new_v4();
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };
        entries.insert(id, payload);
        Ok(id)
    }

    /// Remove and return the payload staged under `id`.
    pub fn read(&self, id: &Uuid) -> Option<T> {
        self.entries.lock().remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> fmt::Debug for EventBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
