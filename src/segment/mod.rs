//! Segment buffering and continuity-era routing.

pub mod cache;
pub mod media_segment;
pub mod store;

pub use cache::{DataSourceCache, DataSources, FeedStatus};
pub use media_segment::{Segment, SegmentChunk, SegmentSource};
pub use store::{AppendOutcome, SegmentStore, StoreError};
