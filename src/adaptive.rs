//! Live-updatable policy cells.
//!
//! Readers take a cheap `Arc` snapshot through `ArcSwap`; writers replace the whole value.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared handle to a value that can be swapped while readers keep working.
#[derive(Debug)]
pub struct Adaptive<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> Clone for Adaptive<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T> Adaptive<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(ArcSwap::from_pointee(value)) }
    }

    /// Snapshot the current value.
    pub fn get(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Replace the value; every clone observes the new one.
    pub fn set(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}
