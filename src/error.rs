use thiserror::Error;

use crate::common::FrameId;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Setup Error: {0}")]
    Setup(#[from] SetupError),
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Sensor Error: {0}")]
    Sensor(#[from] SensorError),
    #[error("Engine Error: {0}")]
    Engine(#[from] EngineError),
}

// Failures before the pipeline loop starts
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Failed to open sensor: {0}")]
    SensorOpen(String),
    #[error("Failed to initialize tracker: {0}")]
    TrackerInit(String),
    #[error("GPU index {index} is out of range, {available} device(s) available")]
    GpuOutOfRange { index: u32, available: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid value '{value}' for {name}")]
    InvalidArgument { name: &'static str, value: String },
    #[error("Unknown gpu type '{0}', expected \"directml\" or \"cuda\"")]
    UnknownGpuType(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Sensor {0} is no longer streaming")]
    Disconnected(uuid::Uuid),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Tracker worker has stopped")]
    Stopped,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("got result for frame {0} that was never submitted for tracking")]
    Unmatched(FrameId),
}
