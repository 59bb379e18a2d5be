use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use super::{BodyTracker, QueuedEngine};
use crate::common::{Body, Frame, Joint, JointConfidence, Skeleton, TrackingResult, Vec3};
use crate::config::{Configuration, GpuType, SimulationConfiguration};
use crate::error::SetupError;

/// How the tracker is brought up. Mirrors what a real body-tracking SDK asks
/// for at creation time.
#[derive(Debug, Clone)]
pub struct TrackerConfiguration {
    pub processing_mode: GpuType,
    pub gpu_device_id: u32,
    pub model_path: String,
}

impl From<&Configuration> for TrackerConfiguration {
    fn from(configuration: &Configuration) -> Self {
        Self {
            processing_mode: configuration.gpu_type,
            gpu_device_id: configuration.gpu_index,
            model_path: configuration.model_path.clone(),
        }
    }
}

/// Stand-in for a GPU body tracker: waits a jittered inference time and
/// reports a random number of skeletons.
pub struct SimulatedTracker {
    inference: Duration,
    jitter: Duration,
    max_bodies: u32,
    rng: StdRng,
}

impl SimulatedTracker {
    pub fn create(
        configuration: TrackerConfiguration,
        simulation: &SimulationConfiguration,
    ) -> Result<Self, SetupError> {
        if configuration.model_path.is_empty() {
            return Err(SetupError::TrackerInit("model path is empty".to_string()));
        }
        if configuration.gpu_device_id >= simulation.gpu_count {
            return Err(SetupError::GpuOutOfRange {
                index: configuration.gpu_device_id,
                available: simulation.gpu_count,
            });
        }

        let rng = match simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        tracing::info!(
            "Tracker created on {} gpu {} with model {}",
            configuration.processing_mode.as_str(),
            configuration.gpu_device_id,
            configuration.model_path
        );

        Ok(Self {
            inference: Duration::from_millis(simulation.inference_ms),
            jitter: Duration::from_millis(simulation.jitter_ms),
            max_bodies: simulation.max_bodies,
            rng,
        })
    }

    fn processing_time(&mut self) -> Duration {
        if self.jitter.is_zero() {
            return self.inference;
        }
        let low = self.inference.saturating_sub(self.jitter);
        let high = self.inference + self.jitter;
        self.rng.random_range(low..=high)
    }

    fn detect_bodies(&mut self, frame: &Frame) -> Vec<Body> {
        let count = self.rng.random_range(0..=self.max_bodies);
        let (width, height) = frame.depth().dimensions();
        let center_depth = frame.depth().get_pixel(width / 2, height / 2)[0] as f32;

        (1..=count)
            .map(|id| {
                let mut skeleton = Skeleton::default();
                for joint in skeleton.joints.iter_mut() {
                    *joint = Joint {
                        position: Vec3 {
                            x: self.rng.random_range(-1_000.0..1_000.0),
                            y: self.rng.random_range(-1_000.0..1_000.0),
                            z: center_depth + self.rng.random_range(-200.0..200.0),
                        },
                        confidence: match self.rng.random_range(0..4) {
                            0 => JointConfidence::None,
                            1 => JointConfidence::Low,
                            2 => JointConfidence::Medium,
                            _ => JointConfidence::High,
                        },
                    };
                }
                Body { id, skeleton }
            })
            .collect()
    }
}

#[async_trait]
impl BodyTracker for SimulatedTracker {
    async fn track(&mut self, frame: Frame) -> TrackingResult {
        let processing = self.processing_time();
        tokio::time::sleep(processing).await;
        let bodies = self.detect_bodies(&frame);
        TrackingResult::new(frame, bodies)
    }
}

/// Create the simulated tracker and start it behind bounded queues.
pub fn start_engine(configuration: &Configuration) -> Result<QueuedEngine, SetupError> {
    let tracker = SimulatedTracker::create(configuration.into(), &configuration.simulation)?;
    Ok(QueuedEngine::start(
        tracker,
        configuration.simulation.ingress_capacity,
        configuration.simulation.egress_capacity,
    ))
}
