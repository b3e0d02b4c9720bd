//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: the per-domain entry-point fallback cascade
//! - `EntryEvent`: fetch outcomes that drive the cascade

mod entry_state;

pub use entry_state::{EntryEvent, EntryState};
