// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-capacity history store.
//!
//! A [`RingBuffer`] keeps the most recent `capacity` items pushed into it. Pushing into a full
//! buffer overwrites the oldest item, so memory stays bounded no matter how much telemetry flows
//! through a push service. Reads always come back oldest first, stitching the two contiguous
//! segments of the backing array together when the logical buffer wraps past its end.
//!
//! All operations take a single reader/writer lock: `push`, `resize` and `clear` are writers,
//! `get_all`, `get_last` and `len` are readers.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::DEFAULT_RING_CAPACITY;

#[derive(Debug)]
pub struct RingBuffer<T> {
    inner: RwLock<Ring<T>>,
}

#[derive(Debug)]
struct Ring<T> {
    slots: Vec<Option<T>>,
    // index of the oldest item
    head: usize,
    // index the next push writes to
    tail: usize,
    count: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, item: T) {
        let capacity = self.capacity();
        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % capacity;
        if self.count == capacity {
            self.head = (self.head + 1) % capacity;
        } else {
            self.count += 1;
        }
    }

    /// Items oldest to newest.
    fn iter(&self) -> impl Iterator<Item = &T> {
        let capacity = self.capacity();
        let end = self.head + self.count;
        let (first, second) = if end <= capacity {
            (&self.slots[self.head..end], &self.slots[..0])
        } else {
            (&self.slots[self.head..], &self.slots[..end - capacity])
        };
        first.iter().chain(second.iter()).filter_map(Option::as_ref)
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    fn resize(&mut self, new_capacity: usize) {
        let capacity = self.capacity();
        let keep = self.count.min(new_capacity);
        let skip = self.count - keep;

        let mut slots: Vec<Option<T>> = Vec::with_capacity(new_capacity);
        for offset in skip..self.count {
            slots.push(self.slots[(self.head + offset) % capacity].take());
        }
        slots.resize_with(new_capacity, || None);

        self.slots = slots;
        self.head = 0;
        self.tail = keep % new_capacity;
        self.count = keep;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Creates a buffer holding up to `capacity` items. A capacity of zero falls back to
    /// [`DEFAULT_RING_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_RING_CAPACITY
        } else {
            capacity
        };
        Self {
            inner: RwLock::new(Ring::with_capacity(capacity)),
        }
    }

    /// Appends `item`, evicting the oldest item when the buffer is full.
    pub fn push(&self, item: T) {
        self.write().push(item);
    }

    /// Returns a copy of every retained item, oldest first.
    pub fn get_all(&self) -> Vec<T> {
        self.read().iter().cloned().collect()
    }

    /// Returns the `n` most recently pushed items, oldest first. Asking for zero items returns
    /// an empty vector and asking for more than are retained returns everything.
    pub fn get_last(&self, n: usize) -> Vec<T> {
        let ring = self.read();
        if n == 0 || ring.count == 0 {
            return Vec::new();
        }
        let skip = ring.count.saturating_sub(n);
        ring.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.read().capacity()
    }

    /// Changes the capacity, keeping the newest `min(new_capacity, len)` items.
    /// A capacity of zero is ignored.
    pub fn resize(&self, new_capacity: usize) {
        if new_capacity == 0 {
            return;
        }
        self.write().resize(new_capacity);
    }

    /// Drops every item while keeping the backing storage.
    pub fn clear(&self) {
        self.write().clear();
    }

    #[allow(clippy::expect_used)]
    fn read(&self) -> RwLockReadGuard<'_, Ring<T>> {
        self.inner.read().expect("lock poisoned")
    }

    #[allow(clippy::expect_used)]
    fn write(&self) -> RwLockWriteGuard<'_, Ring<T>> {
        self.inner.write().expect("lock poisoned")
    }
}

impl<T: Clone> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}
