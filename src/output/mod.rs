//! Output module: dataset schema, incremental sink, and progress events
//!
//! # Components
//!
//! - `ItemRecord` and the fixed CSV column contract
//! - `DatasetSink`: in-memory accumulation with atomic partial/final publish
//! - `EventFeed`: bounded progress feed for an external monitoring surface

mod events;
mod schema;
mod sink;

pub use events::{CrawlEvent, EventFeed, EventSeverity};
pub use schema::{ItemRecord, CSV_HEADERS, PRODUCT_TYPE};
pub use sink::DatasetSink;
