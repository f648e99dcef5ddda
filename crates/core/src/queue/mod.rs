use std::{
    collections::VecDeque,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Default number of frames a queue holds before it resets.
pub const DEFAULT_CAPACITY: usize = 5;

/// Bounded, most-recent-wins hand-off between the capture and render threads.
///
/// New items go to the front and the consumer always takes the front, so it
/// sees the newest frame available. A push into a full queue clears the whole
/// backlog first: a consumer that fell behind resumes from fresh data instead
/// of draining stale frames.
pub struct FrameQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
}

impl<T> FrameQueue<T> {
    /// Creates a queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `item` at the front, clearing the queue first when it is full.
    pub fn try_push(&self, item: T) {
        let mut items = self.lock();
        if items.len() >= self.capacity {
            items.clear();
        }
        items.push_front(item);
    }

    /// Removes and returns the newest item, or `None` when nothing new has
    /// arrived. Never blocks beyond the queue's own lock.
    pub fn try_pop_newest(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // Every operation leaves the deque consistent, so a panic elsewhere while
    // the lock was held cannot corrupt it.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for FrameQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T> fmt::Debug for FrameQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
