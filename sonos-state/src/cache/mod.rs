//! Caches of raw device reports

mod group_view;

pub use group_view::GroupViewCache;
