//! LRU (Least Recently Used) replacement policy.
//!
//! Tracks only frames that are currently evictable (pin count zero), in the
//! order they last became evictable. The victim is always the frame released
//! longest ago, which under the guard API is the unpinned frame least
//! recently touched.

use std::collections::{HashMap, VecDeque};

use crate::common::FrameId;

/// An LRU eviction policy over evictable frames.
///
/// Frames enter the recency queue when their pin count drops to zero and
/// leave it when they are pinned again or evicted, so victim selection never
/// has to skip over pinned frames: everything tracked here is fair game.
///
/// # Implementation
/// The queue is a `VecDeque` of `(frame, stamp)` pairs with lazy
/// invalidation: re-releasing or re-pinning a frame does not search the
/// queue, it just bumps (or drops) the frame's authoritative stamp in
/// `stamps`. Stale queue entries are discarded when `evict` walks past
/// them. All operations are O(1) amortized.
pub struct LruReplacer {
    /// Evictable frames in release order (front = least recently released).
    /// May contain stale entries; `stamps` decides which entry is live.
    queue: VecDeque<(FrameId, u64)>,

    /// Authoritative stamp for each currently-evictable frame.
    stamps: HashMap<FrameId, u64>,

    /// Monotonic counter for stamping queue entries.
    clock: u64,
}

impl LruReplacer {
    /// Create a new LRU replacer.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            stamps: HashMap::new(),
            clock: 0,
        }
    }

    /// Mark a frame as evictable (pin count dropped to 0) or not.
    ///
    /// Becoming evictable enters the frame at the most-recently-used
    /// position; becoming non-evictable removes it from consideration.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.push(frame_id);
        } else {
            self.stamps.remove(&frame_id);
        }
    }

    /// Select a victim frame for eviction.
    ///
    /// Returns the least recently released evictable frame, or None if no
    /// frame is evictable (every resident frame is pinned). The victim is
    /// removed from the replacer.
    pub fn evict(&mut self) -> Option<FrameId> {
        while let Some((frame_id, stamp)) = self.queue.pop_front() {
            if self.stamps.get(&frame_id) == Some(&stamp) {
                self.stamps.remove(&frame_id);
                return Some(frame_id);
            }
            // Stale entry: the frame was pinned again or re-released since.
        }
        None
    }

    fn push(&mut self, frame_id: FrameId) {
        self.clock += 1;
        self.stamps.insert(frame_id, self.clock);
        self.queue.push_back((frame_id, self.clock));
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_basic() {
        let mut replacer = LruReplacer::new();

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);
        replacer.set_evictable(FrameId::new(2), true);

        // Evicts in release order
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_skips_pinned() {
        let mut replacer = LruReplacer::new();

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);
        replacer.set_evictable(FrameId::new(2), true);

        // Frames 0 and 2 get pinned again
        replacer.set_evictable(FrameId::new(0), false);
        replacer.set_evictable(FrameId::new(2), false);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_pin_then_rerelease_is_mru() {
        let mut replacer = LruReplacer::new();

        replacer.set_evictable(FrameId::new(0), true);
        replacer.set_evictable(FrameId::new(1), true);

        // Frame 0 gets pinned and released again: now most recent
        replacer.set_evictable(FrameId::new(0), false);
        replacer.set_evictable(FrameId::new(0), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_lru_stale_entries_discarded() {
        let mut replacer = LruReplacer::new();

        // Pile up stale entries for frame 0
        for _ in 0..10 {
            replacer.set_evictable(FrameId::new(0), true);
            replacer.set_evictable(FrameId::new(0), false);
        }
        replacer.set_evictable(FrameId::new(1), true);
        replacer.set_evictable(FrameId::new(0), true);

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), None);
    }
}
