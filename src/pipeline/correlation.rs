use indexmap::IndexMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::common::FrameId;
use crate::error::CorrelationError;

/// Submission timestamps of frames handed to the tracker, keyed by frame
/// identity. Entries stay in submission order.
#[derive(Debug, Default)]
pub struct CorrelationTracker {
    pending: IndexMap<FrameId, Instant>,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember when `id` was submitted. A frame is submitted at most once, so
    /// a duplicate keeps the first timestamp and returns `false`.
    pub fn record(&mut self, id: FrameId, submitted_at: Instant) -> bool {
        if self.pending.contains_key(&id) {
            tracing::warn!("Frame {} is already pending, keeping first submission time", id);
            return false;
        }
        self.pending.insert(id, submitted_at);
        true
    }

    /// Remove the entry for `id` and return how long it was in flight.
    pub fn resolve(&mut self, id: FrameId, now: Instant) -> Result<Duration, CorrelationError> {
        match self.pending.shift_remove(&id) {
            Some(submitted_at) => Ok(now.saturating_duration_since(submitted_at)),
            None => Err(CorrelationError::Unmatched(id)),
        }
    }

    pub fn is_pending(&self, id: FrameId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Age of the longest outstanding submission.
    pub fn oldest_pending(&self, now: Instant) -> Option<Duration> {
        self.pending
            .first()
            .map(|(_, submitted_at)| now.saturating_duration_since(*submitted_at))
    }
}
