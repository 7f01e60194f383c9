//! Bounded FIFO of precomputed signing material.

use super::Precomputed;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Pool counters snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub generated: u64,
    pub consumed: u64,
    pub size: usize,
}

/// Precomputed-material pool shared by the refill task and signers.
#[derive(Debug)]
pub struct PrecomputePool {
    items: Mutex<VecDeque<Precomputed>>,
    capacity: usize,
    generated: AtomicU64,
    consumed: AtomicU64,
}

impl PrecomputePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            generated: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Append if below capacity. Returns whether the item was kept.
    pub fn push(&self, item: Precomputed) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return false;
        }
        items.push_back(item);
        self.generated.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Take the oldest item.
    pub fn pop(&self) -> Option<Precomputed> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.consumed.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            generated: self.generated.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}
