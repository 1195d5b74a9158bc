//! pagepool - the storage core of a single-file disk-backed database.
//!
//! A fixed-size in-memory cache of disk pages (the buffer pool) sits atop a
//! page-oriented disk manager. Upper layers request pages by logical id and
//! receive a pinned RAII guard; they never deal with file offsets, raw I/O,
//! or cache replacement.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  callers (index / query layer)      │
//! └──────────────────────────┬──────────────────────────┘
//!                            ↓
//! ┌─────────────────────────────────────────────────────┐
//! │              Buffer Pool (buffer/)                  │
//! │   BufferPoolManager + Frame + LRU replacer          │
//! │   page table · free list · pin counts · dirty bits  │
//! └──────────────────────────┬──────────────────────────┘
//!                            ↓
//! ┌─────────────────────────────────────────────────────┐
//! │              Storage Layer (storage/)               │
//! │   DiskManager (page-granular file I/O) + Page       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and LRU eviction
//! - [`storage`] - Disk I/O and the page type
//!
//! # Quick Start
//! ```no_run
//! use pagepool::{BufferPoolManager, DiskManager, PageId};
//!
//! let dm = DiskManager::open_or_create("my_database.db").unwrap();
//! let pool = BufferPoolManager::new(16, dm);
//!
//! // Create a page and write into it
//! let mut guard = pool.new_page().unwrap();
//! let pid = guard.page_id();
//! guard.as_mut_slice()[0] = 0xAB;
//! drop(guard); // pin released, page marked dirty
//!
//! // Read it back (cache hit, no I/O)
//! let guard = pool.fetch_page_read(pid).unwrap();
//! assert_eq!(guard.as_slice()[0], 0xAB);
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use storage::page::Page;
pub use storage::DiskManager;
