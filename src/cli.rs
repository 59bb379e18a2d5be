use crate::config::{Configuration, GpuType};
use crate::error::ConfigError;

/// Parsed positional arguments: `gpu_index [gpu_type [inter_capture_delay_ms]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub gpu_index: u32,
    pub gpu_type: Option<GpuType>,
    pub inter_capture_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Usage,
    Run(CliArgs),
}

impl CliArgs {
    /// Command line values take precedence over file and environment settings.
    pub fn apply(&self, configuration: &mut Configuration) {
        configuration.gpu_index = self.gpu_index;
        if let Some(gpu_type) = self.gpu_type {
            configuration.gpu_type = gpu_type;
        }
        if let Some(delay) = self.inter_capture_delay_ms {
            configuration.inter_capture_delay_ms = delay;
        }
    }
}

/// Parse `args` including the program name in position 0. Arguments past
/// the third are ignored.
pub fn parse(args: &[String]) -> Result<Command, ConfigError> {
    let Some(gpu_index) = args.get(1) else {
        return Ok(Command::Usage);
    };

    let gpu_index = gpu_index
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidArgument {
            name: "gpu_index",
            value: gpu_index.clone(),
        })?;
    let gpu_type = args.get(2).map(|s| s.parse::<GpuType>()).transpose()?;
    let inter_capture_delay_ms = args
        .get(3)
        .map(|s| {
            s.parse::<u64>().map_err(|_| ConfigError::InvalidArgument {
                name: "inter_capture_delay_ms",
                value: s.clone(),
            })
        })
        .transpose()?;

    Ok(Command::Run(CliArgs {
        gpu_index,
        gpu_type,
        inter_capture_delay_ms,
    }))
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage:    {program} gpu_index [gpu_type [inter_capture_delay_ms]]

          gpu_index is integer
          gpu_type is \"directml\" or \"cuda\" with default = directml
          inter_capture_delay_ms is time in integer millisec between camera captures with default = 0

Examples:
          {program} 0                directml gpu 0, no wait
          {program} 1                directml gpu 1, no wait
          {program} 0 cuda           cuda gpu 0, no wait
          {program} 0 directml 33    directml gpu 0, 33 millisecond wait (i.e. 30 fps)

          Sensor is 30 fps NFOV unbinned depth, color off
          Settings are also read from ./bodytrack-bench.toml and BODYTRACK_BENCH__* variables"
    )
}
