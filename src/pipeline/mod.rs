pub mod correlation;
pub mod metrics;
pub mod phase;
pub mod pipeline_loop;
pub mod sink;
pub mod workload;

pub use correlation::CorrelationTracker;
pub use metrics::{MetricsAggregator, REPORT_WINDOW, ReportLine};
pub use phase::LoopPhase;
pub use pipeline_loop::{Iteration, IterationOutcome, LoopSettings, PipelineLoop, SessionTotals};
pub use sink::{ConsoleSink, ReportSink};
