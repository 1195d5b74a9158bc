//! Eviction policy implementations (replacers).
//!
//! - [`LruReplacer`] - strict least-recently-used over evictable frames

mod lru;

pub use lru::LruReplacer;
