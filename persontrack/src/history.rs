use std::collections::VecDeque;
use std::fmt;

/// Fixed-capacity sliding window, oldest entries evicted first
///
/// Storage for all `capacity` slots is reserved up front, so pushing never reallocates.
pub struct History<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for History<T> {
    fn clone(&self) -> Self {
        let mut deque = VecDeque::with_capacity(self.capacity);
        deque.extend(self.deque.iter().cloned());

        Self {
            deque,
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> History<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            deque: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest entry, returning the evicted oldest one when full
    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.deque.back()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    /// Oldest to newest
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }
}

impl<T: Clone> History<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.deque.iter().cloned().collect()
    }
}
