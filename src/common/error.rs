//! Crate-wide error type.

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in the page cache.
///
/// A single error type keeps error handling consistent across the disk
/// manager and the buffer pool; callers match on one enum.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A page id outside the allocated range was passed to disk I/O.
    ///
    /// The reference behavior for this case was a silent no-op, which can
    /// lose writes. Here it is a hard error.
    #[error("page {page_id} out of range ({page_count} pages allocated)")]
    PageOutOfRange { page_id: u32, page_count: u32 },

    /// Every frame is pinned and the free list is empty.
    ///
    /// Fatal to the failing call only; the caller may retry after releasing
    /// pages elsewhere.
    #[error("buffer pool exhausted: no free frame and no unpinned victim")]
    PoolExhausted,

    /// A flush was requested for a page that is not in the buffer pool.
    #[error("page {0} is not resident in the buffer pool")]
    PageNotResident(u32),
}
