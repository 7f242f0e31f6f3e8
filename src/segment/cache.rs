//! Active store plus the queue of stores for later continuity eras.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::segment::media_segment::Segment;
use crate::segment::store::{AppendOutcome, SegmentStore};

/// Secondary stores waiting for activation, oldest era first.
#[derive(Debug, Default)]
pub struct DataSourceCache {
    stores: VecDeque<Arc<SegmentStore>>,
}

impl DataSourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, store: Arc<SegmentStore>) {
        self.stores.push_back(store);
    }

    /// Most recently created entry.
    pub fn back(&self) -> Option<&Arc<SegmentStore>> {
        self.stores.back()
    }

    pub fn pop_front(&mut self) -> Option<Arc<SegmentStore>> {
        self.stores.pop_front()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn clear(&mut self) {
        self.stores.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SegmentStore>> {
        self.stores.iter()
    }

    /// Preloaded segments summed over every cached store.
    pub fn preloaded_segment_count(&self) -> usize {
        self.stores.iter().map(|s| s.preloaded_segment_count()).sum()
    }
}

/// How a fed segment was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Landed in the active store.
    Ok,
    /// Landed in a cached store for a later era.
    Discontinuity,
}

/// The active segment store together with the data source cache.
///
/// Routes appended segments by continuity era: the active store takes its
/// own era, the most recent cache entry gets the next try, and anything else
/// opens a fresh store at the back of the cache.
#[derive(Debug, Default)]
pub struct DataSources {
    active: Option<Arc<SegmentStore>>,
    cache: DataSourceCache,
}

impl DataSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Arc<SegmentStore>> {
        self.active.as_ref()
    }

    pub fn cache(&self) -> &DataSourceCache {
        &self.cache
    }

    /// Append a segment, opening stores as needed.
    pub fn feed(&mut self, segment: Segment) -> FeedStatus {
        let active = self
            .active
            .get_or_insert_with(|| Arc::new(SegmentStore::new()));

        let segment = match active.append(segment) {
            AppendOutcome::Appended => return FeedStatus::Ok,
            AppendOutcome::Provisional(err) => {
                warn!(error = %err, "append failed, provisionally continuing");
                return FeedStatus::Ok;
            }
            AppendOutcome::Discontinuity(segment) => segment,
        };

        let segment = match self.cache.back() {
            Some(store) => match store.append(segment) {
                AppendOutcome::Appended => return FeedStatus::Discontinuity,
                AppendOutcome::Provisional(err) => {
                    warn!(error = %err, "append to cached store failed, provisionally continuing");
                    return FeedStatus::Discontinuity;
                }
                AppendOutcome::Discontinuity(segment) => segment,
            },
            None => segment,
        };

        let store = Arc::new(SegmentStore::new());
        let era = segment.era;
        if let AppendOutcome::Provisional(err) = store.append(segment) {
            warn!(error = %err, "append to new store failed, provisionally continuing");
        }
        info!(store = store.id(), era, cached = self.cache.len() + 1, "opened store for new continuity era");
        self.cache.push_back(store);
        FeedStatus::Discontinuity
    }

    /// Preloaded segments across the active store and all cached stores.
    pub fn total_preloaded(&self) -> usize {
        self.active
            .as_ref()
            .map_or(0, |s| s.preloaded_segment_count())
            + self.cache.preloaded_segment_count()
    }

    pub fn has_pending_eras(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Replace the active store with the oldest cached one.
    ///
    /// The previous active store is dropped; it has been drained by the time
    /// a later era is promoted.
    pub fn promote_next(&mut self) -> Option<Arc<SegmentStore>> {
        let next = self.cache.pop_front()?;
        if let Some(previous) = self.active.replace(Arc::clone(&next)) {
            debug!(
                previous = previous.id(),
                leftover = previous.preloaded_segment_count(),
                "retiring drained store"
            );
        }
        info!(store = next.id(), era = ?next.era(), "promoted cached store");
        Some(next)
    }

    /// Drop every cached store, keeping the active one.
    pub fn clear_pending(&mut self) {
        if !self.cache.is_empty() {
            debug!(dropped = self.cache.len(), "dropping cached continuity eras");
        }
        self.cache.clear();
    }

    /// Drop every store.
    pub fn reset(&mut self) {
        self.active = None;
        self.cache.clear();
    }
}
