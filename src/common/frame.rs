use chrono::{DateTime, Utc};
use image::{ImageBuffer, Luma};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Depth image in millimetres, one `u16` per pixel.
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Correlation identity assigned by the frame source at acquisition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FrameId(u64);

impl FrameId {
    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    pub fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone)]
pub struct Frame {
    id: FrameId,
    source_id: Uuid,
    depth: Arc<DepthImage>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(id: FrameId, source_id: Uuid, depth: DepthImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            id,
            source_id,
            depth: Arc::new(depth),
            captured_at,
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn depth(&self) -> &DepthImage {
        &self.depth
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("source_id", &self.source_id)
            .field("dimensions", &self.depth.dimensions())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
