use std::io::{self, Write};
use std::process::ExitCode;

use bodytrack_bench::cli::{self, Command};
use bodytrack_bench::engine::simulated;
use bodytrack_bench::pipeline::{ConsoleSink, LoopSettings, PipelineLoop};
use bodytrack_bench::{AppError, Configuration, SyntheticSensor};
use tokio_util::sync::CancellationToken;
use tracing::Level;

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // stdout is reserved for measurements
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    ExitCode::from(exit_status(run(&args).await, &mut io::stderr()))
}

fn exit_status(result: Result<(), AppError>, err: &mut impl Write) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(err, "Failed with exception: {e}");
            1
        }
    }
}

async fn run(args: &[String]) -> Result<(), AppError> {
    let cli = match cli::parse(args)? {
        Command::Usage => {
            let program = args.first().map(String::as_str).unwrap_or("bodytrack-bench");
            println!("{}", cli::usage(program));
            return Ok(());
        }
        Command::Run(cli) => cli,
    };

    let mut configuration = Configuration::load()?;
    cli.apply(&mut configuration);
    configuration.validate()?;
    init_logging(configuration.verbose);

    let sensor = SyntheticSensor::open(&configuration.sensor)?;
    let engine = simulated::start_engine(&configuration)?;
    let sink = ConsoleSink::stdio(configuration.report_format);
    let mut pipeline = PipelineLoop::new(
        Box::new(sensor),
        Box::new(engine),
        Box::new(sink),
        LoopSettings::from(&configuration),
    );

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current iteration");
            shutdown.cancel();
        }
    });

    pipeline.run(cancel_token).await?;
    Ok(())
}
