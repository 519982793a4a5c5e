//! Chunk planning.
//!
//! Queue-driven operations consume a [`WorkQueue`] from the front in
//! fixed-size slices; the time-ordered scan instead derives an
//! [`IndexWindow`] from the number of records already accumulated.

/// Split `queue` into its first `min(max_size, len)` items and the rest.
pub fn next_chunk<T>(queue: &[T], max_size: usize) -> (&[T], &[T]) {
    queue.split_at(max_size.min(queue.len()))
}

/// Ordered work items awaiting dispatch. Never reordered; only shrinks.
#[derive(Debug, Clone)]
pub struct WorkQueue<T> {
    items: Vec<T>,
    consumed: usize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, consumed: 0 }
    }

    /// Items still waiting.
    pub fn len(&self) -> usize {
        self.items.len() - self.consumed
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items dispatched successfully so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// The next chunk, without consuming it.
    pub fn peek(&self, max_size: usize) -> &[T] {
        next_chunk(&self.items[self.consumed..], max_size).0
    }

    /// Drop `count` items from the front after their chunk succeeded.
    pub fn advance(&mut self, count: usize) {
        self.consumed = (self.consumed + count).min(self.items.len());
    }
}

/// 1-based inclusive index range for one page of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    pub from_index: usize,
    pub to_index: usize,
}

impl IndexWindow {
    /// The page following `accumulated` records.
    pub fn after(accumulated: usize, page_size: usize) -> Self {
        Self {
            from_index: accumulated + 1,
            to_index: accumulated + page_size,
        }
    }
}
