pub mod synthetic;

use async_trait::async_trait;
use std::time::Duration;

use crate::common::Frame;
use crate::error::SensorError;

pub use synthetic::SyntheticSensor;

/// Source of depth frames.
///
/// `Ok(None)` means no frame became available within `timeout`. That is the
/// normal "camera not ready yet" case and not an error.
#[async_trait]
pub trait FrameSource: Send {
    async fn acquire(&mut self, timeout: Duration) -> Result<Option<Frame>, SensorError>;
}
