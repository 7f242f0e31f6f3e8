pub mod engine;
pub mod geometry;
pub mod state;
pub mod sync;

pub use engine::{MediaBackend, PlaybackEngine, PlaybackStats, PlayerError, UpdateStatus};
pub use geometry::BufferGeometry;
pub use state::PlaybackState;
pub use sync::{AvSync, SyncAction, VideoTiming};
