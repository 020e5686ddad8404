//! Fixed-Size Sliding Window over Temperature Samples
//!
//! ## Overview
//!
//! Every detector owns one window holding the most recent `N` readings of its
//! stream. The window is a ring buffer with a compile-time capacity: it never
//! grows, and pushing into a full window evicts the oldest sample before the
//! new one lands at the tail.
//!
//! ## Why a Ring Buffer?
//!
//! Detectors re-evaluate the whole window on every reading once it has filled,
//! so the buffer has to:
//! - Insert in O(1) with silent eviction (no "full" error path)
//! - Expose the oldest and newest samples in O(1)
//! - Scan oldest to newest for min/max
//!
//! A `[f64; N]` with a write cursor does all of that without allocation.
//!
//! ## Memory Layout
//!
//! ```text
//! SlidingWindow<5> after 7 pushes (values 1..=7):
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  6  │  7  │  3  │  4  │  5  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!             ↑
//!             write_pos = 2 (also the oldest sample once full)
//!
//! Logical view: [3, 4, 5, 6, 7]
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use smokealert_core::buffer::SlidingWindow;
//!
//! let mut window: SlidingWindow<3> = SlidingWindow::new();
//! window.push(300.0);
//! window.push(295.0);
//! assert_eq!(window.oldest(), None); // not full yet
//!
//! window.push(290.0);
//! window.push(280.0); // evicts 300.0
//! assert_eq!(window.oldest(), Some(295.0));
//! assert_eq!(window.newest(), Some(280.0));
//! ```

/// Fixed-capacity sliding window of `f64` samples
///
/// ## Type Parameter
///
/// - `N`: Window capacity. Alert rules only run once exactly `N` samples
///   are held.
///
/// ## Internal Invariants
///
/// - `write_pos < N`
/// - `len <= N`
/// - Slots outside the logical range are never read
///
/// ## Thread Safety
///
/// Not synchronized. The owning detector is the only writer and processes one
/// reading at a time.
#[derive(Debug, Clone)]
pub struct SlidingWindow<const N: usize> {
    /// Sample storage; only the logical range is meaningful
    data: [f64; N],

    /// Index where the next write will occur
    write_pos: usize,

    /// Number of valid samples, saturates at N
    len: usize,
}

impl<const N: usize> SlidingWindow<N> {
    /// Creates an empty window
    pub const fn new() -> Self {
        Self {
            data: [0.0; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Appends a sample, evicting the oldest one if the window is full
    ///
    /// ```rust
    /// # use smokealert_core::buffer::SlidingWindow;
    /// let mut window = SlidingWindow::<3>::new();
    /// for v in [1.0, 2.0, 3.0, 4.0] {
    ///     window.push(v);
    /// }
    /// assert_eq!(window.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    /// ```
    pub fn push(&mut self, sample: f64) {
        if N == 0 {
            return;
        }

        self.data[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Window capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once the window holds exactly `N` samples
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Sample at the start of the window
    ///
    /// Only defined on a full window; returns `None` while filling.
    pub fn oldest(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.get(0)
    }

    /// Most recently pushed sample
    ///
    /// Only defined on a full window; returns `None` while filling and
    /// always on a zero-capacity window.
    pub fn newest(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Smallest sample currently held
    pub fn min(&self) -> Option<f64> {
        self.iter().reduce(f64::min)
    }

    /// Largest sample currently held
    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }

    /// `max - min` over the current contents
    pub fn spread(&self) -> Option<f64> {
        Some(self.max()? - self.min()?)
    }

    /// Iterate over samples from oldest to newest
    pub fn iter(&self) -> SlidingWindowIter<'_, N> {
        SlidingWindowIter {
            window: self,
            index: 0,
        }
    }

    /// Drop all samples
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Sample by logical index (0 = oldest, len-1 = newest)
    ///
    /// While filling, logical and physical indices match. Once full the
    /// oldest sample sits at `write_pos`:
    ///
    /// ```text
    /// Physical:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical:   [A, B, C, D, E]
    /// logical[i] = physical[(write_pos + i) % N]
    /// ```
    fn get(&self, index: usize) -> Option<f64> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        Some(self.data[actual_index])
    }
}

/// Iterator over window contents, oldest first
pub struct SlidingWindowIter<'a, const N: usize> {
    window: &'a SlidingWindow<N>,
    index: usize,
}

impl<'a, const N: usize> Iterator for SlidingWindowIter<'a, N> {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.window.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.window.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, const N: usize> ExactSizeIterator for SlidingWindowIter<'a, N> {}

impl<const N: usize> Default for SlidingWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn empty_window() {
        let window: SlidingWindow<5> = SlidingWindow::new();
        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        assert_eq!(window.capacity(), 5);
        assert!(window.min().is_none());
        assert!(window.max().is_none());
        assert!(window.oldest().is_none());
    }

    #[test]
    fn endpoints_undefined_until_full() {
        let mut window = SlidingWindow::<3>::new();
        window.push(10.0);
        window.push(20.0);

        assert!(!window.is_full());
        assert_eq!(window.oldest(), None);
        assert_eq!(window.newest(), None);
        assert_eq!(window.min(), Some(10.0));
        assert_eq!(window.max(), Some(20.0));

        window.push(30.0);
        assert!(window.is_full());
        assert_eq!(window.oldest(), Some(10.0));
        assert_eq!(window.newest(), Some(30.0));
    }

    #[test]
    fn eviction_keeps_most_recent() {
        let mut window = SlidingWindow::<3>::new();

        for i in 0..5 {
            window.push(i as f64);
        }

        assert_eq!(window.len(), 3);
        assert!(window.is_full());

        let values: Vec<f64> = window.iter().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(window.oldest(), Some(2.0));
        assert_eq!(window.newest(), Some(4.0));
    }

    #[test]
    fn min_max_track_evictions() {
        let mut window = SlidingWindow::<3>::new();
        for v in [100.0, 5.0, 50.0, 60.0, 70.0] {
            window.push(v);
        }

        // 100 and 5 are gone
        assert_eq!(window.min(), Some(50.0));
        assert_eq!(window.max(), Some(70.0));
        assert_eq!(window.spread(), Some(20.0));
    }

    #[test]
    fn clear_resets() {
        let mut window = SlidingWindow::<2>::new();
        window.push(1.0);
        window.push(2.0);
        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.iter().count(), 0);

        window.push(3.0);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![3.0]);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut window = SlidingWindow::<0>::new();
        window.push(42.0);

        assert!(window.is_empty());
        assert_eq!(window.oldest(), None);
        assert_eq!(window.newest(), None);
        assert_eq!(window.spread(), None);
        assert_eq!(window.iter().count(), 0);
    }

    #[test]
    fn iterator_reports_exact_size() {
        let mut window = SlidingWindow::<4>::new();
        window.push(1.0);
        window.push(2.0);

        let mut iter = window.iter();
        assert_eq!(iter.len(), 2);
        iter.next();
        assert_eq!(iter.len(), 1);
    }
}
