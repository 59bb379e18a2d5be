pub mod frame;
pub mod tracking;

pub use frame::{DepthImage, Frame, FrameId};
pub use tracking::{Body, Joint, JointConfidence, Skeleton, TrackingResult, Vec3};
