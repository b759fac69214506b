//! State module for tracking item load progress
//!
//! # Components
//!
//! - `ItemStatus`: Tracks where a single item is in its load lifecycle
//!   (pending, open, complete, warning, error)

mod item_status;

pub use item_status::ItemStatus;
