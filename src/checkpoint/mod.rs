//! Checkpoint persistence for crash recovery and resume
//!
//! The checkpoint is a timestamped JSON snapshot of the crawl state. A
//! checkpoint older than 24 hours, corrupt, or written under a different
//! configuration is treated as absent and never resumed.

mod store;

pub use store::{Checkpoint, CheckpointStore};
