//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting via RAII guards
//! - Automatic dirty page write-back on eviction
//! - LRU victim selection

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use parking_lot::{Mutex, RwLock};

use crate::buffer::replacer::LruReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::DiskManager;

/// Manages a fixed pool of frames for caching disk pages.
///
/// At most `pool_size` pages are resident at once; a resident page is
/// reachable from its id in O(1) through the page table, and a page with an
/// outstanding pin is never evicted or overwritten.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ LruReplacer  │  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `page_table`: `RwLock` — many readers, few writers
/// - `free_list`: `Mutex` — always modified
/// - `replacer`: `Mutex` — internal state changes on access
/// - `disk_manager`: `Mutex` — single-threaded I/O
/// - `frames`: No lock — fixed size, each Frame has internal locks
/// - `stats`: No lock — all atomic counters
///
/// Disk I/O during a miss or eviction happens with the frame already claimed
/// but the global maps unlocked, so unrelated fetches are not serialized
/// behind disk latency.
///
/// Hits pin their frame while still holding the table lock, and eviction
/// claims its victim with a pin of its own, validating under the table
/// write lock that no other pin or dirty byte appeared before the entry is
/// removed. A frame backing a live guard therefore cannot be repurposed.
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::open_or_create("test.db")?;
/// let pool = BufferPoolManager::new(10, dm);
///
/// // Allocate a new page
/// let mut guard = pool.new_page()?;
/// guard.as_mut_slice()[0] = 0xAB;
/// // guard drops: page marked dirty, unpinned
///
/// // Fetch existing page for reading
/// let guard = pool.fetch_page_read(PageId::new(0))?;
/// let data = guard.as_slice();
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Maps resident page IDs to frame IDs.
    page_table: RwLock<HashMap<PageId, FrameId>>,

    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Mutex<Vec<FrameId>>,

    /// Recency order over unpinned resident frames.
    replacer: Mutex<LruReplacer>,

    /// Handles all disk I/O.
    disk_manager: Mutex<DiskManager>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager.
    ///
    /// # Arguments
    /// * `pool_size` - Number of frames in the pool
    /// * `disk_manager` - Handles disk I/O
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        // Allocate all frames upfront
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();

        // All frames start on the free list
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruReplacer::new()),
            disk_manager: Mutex::new(disk_manager),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// If the page is already resident, this is a cache hit: the frame is
    /// pinned and returned with no I/O. Otherwise the page is loaded from
    /// disk, possibly evicting the least recently used unpinned page.
    ///
    /// # Errors
    /// - `Error::PageOutOfRange` if the page was never allocated on disk
    /// - `Error::PoolExhausted` if all frames are pinned
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// Same as `fetch_page_read`, but returns an exclusive guard. The page
    /// is marked dirty when the guard drops.
    ///
    /// # Errors
    /// - `Error::PageOutOfRange` if the page was never allocated on disk
    /// - `Error::PoolExhausted` if all frames are pinned
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Create pages
    // ========================================================================

    /// Allocate a new page on disk and load it into the buffer pool.
    ///
    /// Returns a write guard for the new, zeroed page; `guard.page_id()`
    /// gives the freshly allocated id. The caller holds the only pin until
    /// the guard drops.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if all frames are pinned
    /// - I/O errors from disk allocation
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        // Get a free frame (or evict one)
        let frame_id = self.acquire_frame()?;

        // Allocate page on disk (extends the file by one zeroed page)
        let allocated = {
            let mut dm = self.disk_manager.lock();
            dm.allocate_page()
        };
        let page_id = match allocated {
            Ok(pid) => pid,
            Err(e) => {
                // Return the claimed frame so the failure doesn't leak it
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0];

        // Fresh page starts zeroed
        frame.page_mut().reset();
        frame.set_page_id(Some(page_id));

        // New page starts with pin_count = 1; the frame came off the free
        // list or out of an eviction, so it has no replacer entry to clear
        frame.pin();

        {
            let mut pt = self.page_table.write();
            pt.insert(page_id, frame_id);
        }

        let lock = frame.page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Flush a page's bytes to disk and clear its dirty flag.
    ///
    /// Works regardless of pin state. Clean pages are already on disk and
    /// are not rewritten.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the buffer pool;
    ///   flushing a page nobody holds indicates caller misuse
    /// - I/O errors from the disk write
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = {
            let pt = self.page_table.read();
            match pt.get(&page_id) {
                Some(&fid) => fid,
                None => return Err(Error::PageNotResident(page_id.0)),
            }
        };

        self.flush_frame(frame_id, page_id)
    }

    /// Flush all resident dirty pages to disk.
    ///
    /// The order across frames is unspecified.
    ///
    /// # Errors
    /// - I/O errors from disk writes
    pub fn flush_all_pages(&self) -> Result<()> {
        // Snapshot the table so I/O happens without holding the lock
        let pages: Vec<(PageId, FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
        };

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }

        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Get the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Get the number of pages resident in the buffer pool.
    pub fn page_count(&self) -> usize {
        self.page_table.read().len()
    }

    /// Get the number of pages allocated on disk.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    // ========================================================================
    // Internal: Called by guards on drop
    // ========================================================================

    /// Release one pin on a frame. Called by PageReadGuard/PageWriteGuard
    /// on drop; dropping the guard is the only way to release a pin.
    ///
    /// The dirty flag is sticky: it is ORed in here and cleared only by a
    /// flush. A frame whose pin count reaches zero becomes an eviction
    /// candidate at the most-recently-used position; it is not evicted
    /// eagerly.
    pub(crate) fn release_pin(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        let new_pin_count = frame.unpin();

        if new_pin_count == 0 {
            let mut replacer = self.replacer.lock();
            replacer.set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Fetch a page into the buffer pool, returning its frame ID.
    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        // Fast path: pin while still holding the table lock. Eviction
        // validates pin counts under the table write lock, so it either
        // sees this pin or finishes (and removes the entry) before the
        // lookup — the frame can never be repurposed under a hit.
        {
            let pt = self.page_table.read();
            if let Some(&frame_id) = pt.get(&page_id) {
                self.frames[frame_id.0].pin();
                drop(pt);

                {
                    let mut replacer = self.replacer.lock();
                    replacer.set_evictable(frame_id, false);
                }

                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(frame_id);
            }
        }

        self.handle_cache_miss(page_id)
    }

    /// Handle a cache miss: get a frame, load from disk, update mappings.
    fn handle_cache_miss(&self, page_id: PageId) -> Result<FrameId> {
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let frame_id = self.acquire_frame()?;

        // Read page from disk; the frame is claimed but no global lock held
        let read = {
            let mut dm = self.disk_manager.lock();
            dm.read_page(page_id)
        };
        let page_data = match read {
            Ok(page) => page,
            Err(e) => {
                // Return the claimed frame so the failure doesn't leak it
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];

        {
            let mut page = frame.page_mut();
            page.as_mut_slice().copy_from_slice(page_data.as_slice());
        }

        frame.set_page_id(Some(page_id));

        let mut pt = self.page_table.write();
        if let Some(&existing) = pt.get(&page_id) {
            // A concurrent miss for the same id won the install race; pin
            // its frame instead and hand ours back to the free list.
            self.frames[existing.0].pin();
            {
                let mut replacer = self.replacer.lock();
                replacer.set_evictable(existing, false);
            }
            drop(pt);

            frame.reset();
            self.free_list.lock().push(frame_id);
            return Ok(existing);
        }

        // Pinned before the entry becomes visible
        frame.pin();
        pt.insert(page_id, frame_id);

        Ok(frame_id)
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Acquire a frame for a new occupant: pop the free list, or evict the
    /// LRU unpinned page. Shared by the fetch miss path and `new_page`.
    fn acquire_frame(&self) -> Result<FrameId> {
        {
            let mut fl = self.free_list.lock();
            if let Some(frame_id) = fl.pop() {
                return Ok(frame_id);
            }
        }

        // No free frames, need to evict
        self.evict_page()
    }

    /// Evict the LRU unpinned page and return its frame, fully reset.
    ///
    /// A candidate is claimed with a pin of its own before the write-back,
    /// so no competing eviction can take the frame while its bytes drain to
    /// disk, and the page stays fetchable until it actually leaves the
    /// table. The claim holds only if the frame is still sole-pinned and
    /// clean once the flush is done; otherwise it is released and the
    /// search moves to the next candidate.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every resident frame is pinned
    fn evict_page(&self) -> Result<FrameId> {
        loop {
            let frame_id = {
                let mut replacer = self.replacer.lock();
                replacer.evict().ok_or(Error::PoolExhausted)?
            };
            let frame = &self.frames[frame_id.0];

            // Claim under the table lock. Hits pin while holding the table
            // read lock, so any pin taken since the frame left the replacer
            // is visible here.
            {
                let pt = self.page_table.write();
                if frame.is_pinned() {
                    // Re-pinned; it rejoins the replacer when released
                    continue;
                }
                frame.pin();
                drop(pt);
            }

            // Write-back with the table unlocked; fetches of this page
            // still hit normally while the flush runs.
            if frame.is_dirty() {
                if let Some(pid) = frame.page_id() {
                    if let Err(e) = self.flush_frame(frame_id, pid) {
                        // Surrender the claim; the page stays resident and
                        // dirty so the bytes are not lost
                        self.release_pin(frame_id, false);
                        return Err(e);
                    }
                }
            }

            // Validate: the claim must be the only pin and the bytes must
            // still be clean, or a fetch/write slipped in during the flush.
            {
                let mut pt = self.page_table.write();
                if frame.pin_count() > 1 || frame.is_dirty() {
                    drop(pt);
                    self.release_pin(frame_id, false);
                    continue;
                }
                if let Some(pid) = frame.page_id() {
                    pt.remove(&pid);
                }
            }

            self.stats.evictions.fetch_add(1, Ordering::Relaxed);

            // Out of the table, the replacer, and the free list: the frame
            // is unreachable. The reset clears the claim pin along with the
            // rest of the old occupant's state.
            frame.reset();

            return Ok(frame_id);
        }
    }

    /// Flush a frame to disk if it is dirty and still holds `page_id`.
    ///
    /// The occupancy check runs under the frame's page lock: reassigning a
    /// frame rewrites its bytes under the page write lock first, so a frame
    /// that matches here cannot be carrying another page's data. A frame
    /// that no longer matches was evicted after the caller's lookup, and
    /// the evictor already wrote it back.
    ///
    /// The dirty flag is cleared only after the write succeeds; a failed
    /// flush leaves the frame dirty so the data is not silently lost.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        // Hold page read lock while writing to disk
        let page = frame.page();

        if frame.page_id() != Some(page_id) {
            return Ok(());
        }

        if frame.is_dirty() {
            {
                let mut dm = self.disk_manager.lock();
                dm.write_page(page_id, &page)?;
            }
            drop(page);

            frame.clear_dirty();
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}
