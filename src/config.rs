use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Base name of the optional configuration file in the working directory.
pub const CONFIG_FILE: &str = "bodytrack-bench";
/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "BODYTRACK_BENCH_CONFIG";
/// Prefix for environment overrides. `__` separates the prefix and nested keys,
/// e.g. `BODYTRACK_BENCH__WATCHDOG_TIMEOUT_MS` or `BODYTRACK_BENCH__SENSOR__FPS`.
pub const ENV_PREFIX: &str = "BODYTRACK_BENCH";

/// Execution backend of the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuType {
    #[default]
    DirectMl,
    Cuda,
}

impl GpuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpuType::DirectMl => "directml",
            GpuType::Cuda => "cuda",
        }
    }
}

impl FromStr for GpuType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directml" => Ok(GpuType::DirectMl),
            "cuda" => Ok(GpuType::Cuda),
            other => Err(ConfigError::UnknownGpuType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfiguration {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for SensorConfiguration {
    // NFOV unbinned depth at 30 fps
    fn default() -> Self {
        Self {
            fps: 30,
            width: 640,
            height: 576,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfiguration {
    pub gpu_count: u32,
    pub ingress_capacity: usize,
    pub egress_capacity: usize,
    pub inference_ms: u64,
    pub jitter_ms: u64,
    pub max_bodies: u32,
    pub seed: Option<u64>,
}

impl Default for SimulationConfiguration {
    fn default() -> Self {
        Self {
            gpu_count: 1,
            ingress_capacity: 1,
            egress_capacity: 1,
            inference_ms: 25,
            jitter_ms: 5,
            max_bodies: 2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub gpu_index: u32,
    pub gpu_type: GpuType,
    pub inter_capture_delay_ms: u64,
    pub acquire_timeout_ms: u64,
    pub watchdog_timeout_ms: u64,
    pub model_path: String,
    pub report_format: ReportFormat,
    pub verbose: bool,
    pub sensor: SensorConfiguration,
    pub simulation: SimulationConfiguration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            gpu_index: 0,
            gpu_type: GpuType::default(),
            inter_capture_delay_ms: 0,
            acquire_timeout_ms: 0,
            watchdog_timeout_ms: 5_000,
            model_path: "dnn_model_2_0_op11.onnx".to_string(),
            report_format: ReportFormat::default(),
            verbose: false,
            sensor: SensorConfiguration::default(),
            simulation: SimulationConfiguration::default(),
        }
    }
}

impl Configuration {
    /// Layer defaults, the optional config file and `BODYTRACK_BENCH__*`
    /// environment variables. Validation is left to the caller so it runs
    /// once, after command line overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| CONFIG_FILE.to_string());
        Self::build(
            config::Config::builder()
                .add_source(config::File::with_name(&path).required(false))
                .add_source(env_overrides()),
        )
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn inter_capture_delay(&self) -> Duration {
        Duration::from_millis(self.inter_capture_delay_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchdog_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Watchdog timeout must be greater than 0".to_string(),
            ));
        }

        if self.sensor.fps == 0 {
            return Err(ConfigError::Invalid(
                "Sensor fps must be greater than 0".to_string(),
            ));
        }

        if self.sensor.width == 0 || self.sensor.height == 0 {
            return Err(ConfigError::Invalid(
                "Sensor resolution must be non-zero".to_string(),
            ));
        }

        if self.simulation.ingress_capacity == 0 || self.simulation.egress_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Tracker queue capacities must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_overrides() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}
