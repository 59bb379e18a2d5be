use serde::Serialize;

use super::frame::{Frame, FrameId};

/// Number of joints in a tracked skeleton.
pub const JOINT_COUNT: usize = 32;

/// Index of the navel joint, the one touched by the consumption workload.
pub const SPINE_NAVEL: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum JointConfidence {
    #[default]
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Joint {
    pub position: Vec3,
    pub confidence: JointConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skeleton {
    pub joints: [Joint; JOINT_COUNT],
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            joints: [Joint::default(); JOINT_COUNT],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Body {
    pub id: u32,
    pub skeleton: Skeleton,
}

/// Output of the tracker for one submitted frame. Hands the frame back to the
/// caller so its identity can be correlated with the submission.
#[derive(Debug, Clone)]
pub struct TrackingResult {
    capture: Frame,
    bodies: Vec<Body>,
}

impl TrackingResult {
    pub fn new(capture: Frame, bodies: Vec<Body>) -> Self {
        Self { capture, bodies }
    }

    pub fn frame_id(&self) -> FrameId {
        self.capture.id()
    }

    pub fn capture(&self) -> &Frame {
        &self.capture
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }
}
