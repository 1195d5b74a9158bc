//! The page type.
//!
//! - [`Page`] - The raw 4KB data container

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
