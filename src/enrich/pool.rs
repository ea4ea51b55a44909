//! Reusable record pool.
//!
//! A pooled record's previous contents are arbitrary; the acquirer must
//! overwrite every field. `release` takes the record by value, so once it
//! is back in the pool its previous owner can no longer read it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

pub struct ObjectPool<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl<T: Default> ObjectPool<T> {
    /// Create a pool keeping at most `max_idle` released records.
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Take a record from the pool, allocating a new one if none is idle.
    pub fn acquire(&self) -> T {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();

        match reused {
            Some(item) => item,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        }
    }

    /// Hand a record back. Records beyond `max_idle` are dropped.
    pub fn release(&self, item: T) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    pub fn idle_len(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of records allocated by this pool so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}
