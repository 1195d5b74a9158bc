//! Storage layer - disk I/O and the page type.
//!
//! - [`DiskManager`] - Page-granular file I/O and page id allocation
//! - [`page`] - The raw page buffer

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;
