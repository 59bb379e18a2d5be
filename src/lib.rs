pub mod cli;
pub mod common;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sensor;

pub use config::Configuration;
pub use error::{AppError, ConfigError, CorrelationError, EngineError, SensorError, SetupError};

pub use engine::{InferenceEngine, QueuedEngine};
pub use pipeline::PipelineLoop;
pub use sensor::{FrameSource, SyntheticSensor};
