use async_trait::async_trait;
use chrono::Utc;
use image::Luma;
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use uuid::Uuid;

use super::FrameSource;
use crate::common::{DepthImage, Frame, FrameId};
use crate::config::SensorConfiguration;
use crate::error::{SensorError, SetupError};

/// Nearest and farthest depth values written into synthetic frames, in mm.
const DEPTH_NEAR_MM: u16 = 500;
const DEPTH_RANGE_MM: u32 = 3_000;

/// Free-running depth camera that produces one frame per capture slot.
pub struct SyntheticSensor {
    id: Uuid,
    width: u32,
    height: u32,
    period: Duration,
    next_capture: Instant,
    next_sequence: u64,
}

impl SyntheticSensor {
    pub fn open(config: &SensorConfiguration) -> Result<Self, SetupError> {
        if config.fps == 0 {
            return Err(SetupError::SensorOpen(
                "frame rate must be greater than 0".to_string(),
            ));
        }
        if config.width == 0 || config.height == 0 {
            return Err(SetupError::SensorOpen(format!(
                "unsupported resolution {}x{}",
                config.width, config.height
            )));
        }

        let sensor = Self {
            id: Uuid::new_v4(),
            width: config.width,
            height: config.height,
            period: Duration::from_secs(1) / config.fps,
            next_capture: Instant::now(),
            next_sequence: 0,
        };
        tracing::info!(
            "Sensor {} streaming {}x{} depth at {} fps",
            sensor.id,
            sensor.width,
            sensor.height,
            config.fps
        );
        Ok(sensor)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn capture(&mut self) -> Frame {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let depth = DepthImage::from_fn(self.width, self.height, |x, y| {
            let offset = (x as u64 + y as u64 + sequence) % DEPTH_RANGE_MM as u64;
            Luma([DEPTH_NEAR_MM + offset as u16])
        });
        Frame::new(FrameId::new(sequence), self.id, depth, Utc::now())
    }

    /// Move to the next capture slot in the future; slots missed while the
    /// consumer was busy are dropped.
    fn advance_slot(&mut self, now: Instant) {
        self.next_capture += self.period;
        while self.next_capture <= now {
            self.next_capture += self.period;
        }
    }
}

#[async_trait]
impl FrameSource for SyntheticSensor {
    async fn acquire(&mut self, timeout: Duration) -> Result<Option<Frame>, SensorError> {
        let now = Instant::now();
        if self.next_capture > now {
            if self.next_capture > now + timeout {
                if timeout.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    sleep(timeout).await;
                }
                return Ok(None);
            }
            sleep_until(self.next_capture).await;
        }

        let frame = self.capture();
        self.advance_slot(Instant::now());
        Ok(Some(frame))
    }
}
