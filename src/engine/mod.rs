pub mod queued;
pub mod simulated;

use async_trait::async_trait;
use std::time::Duration;

use crate::common::{Frame, TrackingResult};
use crate::error::EngineError;

pub use queued::QueuedEngine;
pub use simulated::{SimulatedTracker, TrackerConfiguration};

/// Asynchronous inference service with a bounded ingress and egress queue.
///
/// Both calls are bounded by the caller's watchdog timeout:
/// - `submit` returns `Ok(false)` when the ingress queue did not accept the
///   frame in time. The frame is dropped.
/// - `retrieve` returns `Ok(None)` when no result completed in time.
///
/// Results are matched to submissions through [`TrackingResult::frame_id`],
/// never through arrival order. `Err` means the engine itself is gone.
#[async_trait]
pub trait InferenceEngine: Send {
    async fn submit(&mut self, frame: Frame, timeout: Duration) -> Result<bool, EngineError>;
    async fn retrieve(&mut self, timeout: Duration) -> Result<Option<TrackingResult>, EngineError>;
}

/// The algorithm behind an engine: turns one frame into one result.
#[async_trait]
pub trait BodyTracker: Send + 'static {
    async fn track(&mut self, frame: Frame) -> TrackingResult;
}
