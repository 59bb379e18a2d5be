use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::correlation::CorrelationTracker;
use super::metrics::{MetricsAggregator, ReportLine};
use super::phase::LoopPhase;
use super::sink::ReportSink;
use super::workload;
use crate::common::FrameId;
use crate::config::Configuration;
use crate::engine::InferenceEngine;
use crate::error::AppError;
use crate::sensor::FrameSource;

/// Timing knobs of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Minimum time between the start of two iterations.
    pub inter_capture_delay: Duration,
    /// How long to wait for the sensor each iteration.
    pub acquire_timeout: Duration,
    /// Bound on both submit and retrieve.
    pub watchdog_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&Configuration::default())
    }
}

impl From<&Configuration> for LoopSettings {
    fn from(configuration: &Configuration) -> Self {
        Self {
            inter_capture_delay: configuration.inter_capture_delay(),
            acquire_timeout: configuration.acquire_timeout(),
            watchdog_timeout: configuration.watchdog_timeout(),
        }
    }
}

/// What happened to the frame (if any) handled in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Sensor had nothing this tick.
    NoFrame,
    /// Ingress did not accept the frame; it was dropped.
    SubmitTimeout(FrameId),
    /// Frame was submitted but no result arrived in time. It stays pending.
    RetrieveTimeout(FrameId),
    /// A result was correlated with its submission.
    Completed { frame: FrameId, latency: Duration },
    /// The engine returned a result whose frame is not pending.
    Unmatched { submitted: FrameId, returned: FrameId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub outcome: IterationOutcome,
    pub report: Option<ReportLine>,
}

/// Lifetime counters, logged when the loop stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub iterations: u64,
    pub frames_tracked: u64,
    pub idle_ticks: u64,
    pub submit_timeouts: u64,
    pub retrieve_timeouts: u64,
    pub unmatched: u64,
    pub reports: u64,
}

/// Drives sensor → tracker → correlation → metrics, one frame per iteration.
///
/// Every timeout ends the iteration without retrying. Only sensor and engine
/// failures leave the loop.
pub struct PipelineLoop {
    source: Box<dyn FrameSource>,
    engine: Box<dyn InferenceEngine>,
    sink: Box<dyn ReportSink>,
    settings: LoopSettings,
    tracker: CorrelationTracker,
    metrics: MetricsAggregator,
    totals: SessionTotals,
    phase: LoopPhase,
    next_iteration_at: Instant,
}

impl PipelineLoop {
    pub fn new(
        source: Box<dyn FrameSource>,
        engine: Box<dyn InferenceEngine>,
        sink: Box<dyn ReportSink>,
        settings: LoopSettings,
    ) -> Self {
        let now = Instant::now();
        Self {
            source,
            engine,
            sink,
            settings,
            tracker: CorrelationTracker::new(),
            metrics: MetricsAggregator::new(now),
            totals: SessionTotals::default(),
            phase: LoopPhase::Idle,
            next_iteration_at: now,
        }
    }

    /// Run until `cancel_token` fires. Cancellation is only observed between
    /// iterations.
    pub async fn run(&mut self, cancel_token: CancellationToken) -> Result<SessionTotals, AppError> {
        info!(
            "Pipeline loop started: delay={:?} acquire_timeout={:?} watchdog={:?}",
            self.settings.inter_capture_delay,
            self.settings.acquire_timeout,
            self.settings.watchdog_timeout
        );

        while !cancel_token.is_cancelled() {
            if let Err(e) = self.run_iteration().await {
                error!("Pipeline loop failed: {}", e);
                return Err(e);
            }
        }

        info!(
            "Pipeline loop stopped: {} iterations, {} idle, {} frames tracked, {} submit timeouts, {} retrieve timeouts, {} unmatched, {} reports, {} still pending",
            self.totals.iterations,
            self.totals.idle_ticks,
            self.totals.frames_tracked,
            self.totals.submit_timeouts,
            self.totals.retrieve_timeouts,
            self.totals.unmatched,
            self.totals.reports,
            self.tracker.pending()
        );
        Ok(self.totals.clone())
    }

    #[instrument(level = "debug", skip(self), fields(iteration = self.totals.iterations + 1))]
    pub async fn run_iteration(&mut self) -> Result<Iteration, AppError> {
        self.enter(LoopPhase::Idle);
        sleep_until(self.next_iteration_at).await;
        self.next_iteration_at = Instant::now() + self.settings.inter_capture_delay;
        self.totals.iterations += 1;

        let outcome = self.process_frame().await?;
        self.count(&outcome);

        // Runs even when no frame completed so a stalled tracker still reports.
        self.enter(LoopPhase::Updating);
        let report = self.metrics.maybe_report(Instant::now());
        if let Some(report) = &report {
            self.totals.reports += 1;
            self.sink.report(report);
        }

        Ok(Iteration { outcome, report })
    }

    async fn process_frame(&mut self) -> Result<IterationOutcome, AppError> {
        self.advance();
        let Some(frame) = self.source.acquire(self.settings.acquire_timeout).await? else {
            return Ok(IterationOutcome::NoFrame);
        };
        let frame_id = frame.id();

        self.advance();
        let submitted_at = Instant::now();
        if !self.engine.submit(frame, self.settings.watchdog_timeout).await? {
            warn!(
                "Tracker did not accept frame {} within {:?}",
                frame_id, self.settings.watchdog_timeout
            );
            self.sink.submit_timeout(frame_id);
            return Ok(IterationOutcome::SubmitTimeout(frame_id));
        }
        self.tracker.record(frame_id, submitted_at);

        self.advance();
        let Some(result) = self.engine.retrieve(self.settings.watchdog_timeout).await? else {
            // Late results can still arrive on a later retrieve, deepening the
            // egress backlog.
            warn!(
                "No tracking result within {:?}, {} frame(s) pending, oldest {:?}",
                self.settings.watchdog_timeout,
                self.tracker.pending(),
                self.tracker.oldest_pending(Instant::now()).unwrap_or_default()
            );
            self.sink.retrieve_timeout();
            return Ok(IterationOutcome::RetrieveTimeout(frame_id));
        };

        self.metrics.record_frame();
        workload::consume(&result);

        let returned = result.frame_id();
        match self.tracker.resolve(returned, Instant::now()) {
            Ok(latency) => {
                debug!("Frame {} end-to-end {:?}", returned, latency);
                self.metrics.record_latency(latency);
                Ok(IterationOutcome::Completed {
                    frame: returned,
                    latency,
                })
            }
            Err(e) => {
                error!("{}", e);
                self.sink.unmatched(returned);
                Ok(IterationOutcome::Unmatched {
                    submitted: frame_id,
                    returned,
                })
            }
        }
    }

    fn advance(&mut self) {
        self.enter(self.phase.next());
    }

    fn enter(&mut self, phase: LoopPhase) {
        debug!("{} -> {}", self.phase.as_str(), phase.as_str());
        self.phase = phase;
    }

    fn count(&mut self, outcome: &IterationOutcome) {
        match outcome {
            IterationOutcome::NoFrame => self.totals.idle_ticks += 1,
            IterationOutcome::SubmitTimeout(_) => self.totals.submit_timeouts += 1,
            IterationOutcome::RetrieveTimeout(_) => self.totals.retrieve_timeouts += 1,
            IterationOutcome::Completed { .. } => self.totals.frames_tracked += 1,
            IterationOutcome::Unmatched { .. } => {
                self.totals.frames_tracked += 1;
                self.totals.unmatched += 1;
            }
        }
    }

    pub fn tracker(&self) -> &CorrelationTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn totals(&self) -> &SessionTotals {
        &self.totals
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }
}
