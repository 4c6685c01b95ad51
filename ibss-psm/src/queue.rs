//! Bounded FIFO frame queues.
use heapless::Deque;

/// A FIFO with a fixed capacity `N` and an additional, runtime admission
/// limit.
///
/// Besides FIFO order the queue supports moving an arbitrary entry to the
/// front, which lets the scheduler send frames for awake neighbors ahead of
/// frames that have to wait for the next announcement.
#[derive(Debug)]
pub struct FrameQueue<T, const N: usize> {
    entries: Deque<T, N>,
}

impl<T, const N: usize> FrameQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends `entry` if the queue holds fewer than `limit` entries.
    ///
    /// Returns the new length. On overflow the queue is left untouched and
    /// the entry is handed back.
    pub fn push_tail(&mut self, entry: T, limit: usize) -> core::result::Result<usize, T> {
        if self.entries.len() >= limit.min(N) {
            return Err(entry);
        }
        self.entries.push_back(entry)?;
        Ok(self.entries.len())
    }

    pub fn peek_head(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn peek_head_mut(&mut self) -> Option<&mut T> {
        self.entries.front_mut()
    }

    /// The entry at position `index`, counted from the head.
    pub fn peek(&self, index: usize) -> Option<&T> {
        self.entries.iter().nth(index)
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    /// The position of the first entry matching `predicate`.
    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.entries.iter().position(predicate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Moves the entry at `index` to the head, keeping the relative order of
    /// all other entries. Out-of-range indices are ignored.
    pub fn move_to_front(&mut self, index: usize) {
        if index == 0 || index >= self.entries.len() {
            return;
        }

        let (first, second) = self.entries.as_mut_slices();
        if index < first.len() {
            first[..=index].rotate_right(1);
        } else {
            let index = index - first.len();
            second[..=index].rotate_right(1);
            // The target is now at the start of the second slice: swap it
            // with the last element of the first slice and rotate the first
            // slice to bring it to the head.
            if let Some(last) = first.last_mut() {
                core::mem::swap(last, &mut second[0]);
                first.rotate_right(1);
            }
        }
    }

    /// Drops all entries.
    pub fn erase_all(&mut self) {
        self.entries.clear();
    }

    /// Keeps only the entries matching `keep`, in order. Returns the number
    /// of dropped entries.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut dropped = 0;
        for _ in 0..self.entries.len() {
            let Some(entry) = self.entries.pop_front() else {
                break;
            };
            if keep(&entry) {
                // An entry was just taken, there is room.
                let _ = self.entries.push_back(entry);
            } else {
                dropped += 1;
            }
        }
        dropped
    }
}

impl<T, const N: usize> Default for FrameQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
