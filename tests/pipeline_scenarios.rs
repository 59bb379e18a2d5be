use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bodytrack_bench::common::{DepthImage, Frame, FrameId, TrackingResult};
use bodytrack_bench::config::{Configuration, SensorConfiguration, SimulationConfiguration};
use bodytrack_bench::engine::simulated;
use bodytrack_bench::pipeline::{IterationOutcome, LoopSettings, PipelineLoop, ReportLine, ReportSink};
use bodytrack_bench::{
    AppError, EngineError, FrameSource, InferenceEngine, SensorError, SyntheticSensor,
};
use chrono::Utc;
use image::Luma;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const WATCHDOG: Duration = Duration::from_millis(5_000);

fn frame(sequence: u64) -> Frame {
    Frame::new(
        FrameId::new(sequence),
        Uuid::nil(),
        DepthImage::from_pixel(2, 2, Luma([1000])),
        Utc::now(),
    )
}

#[derive(Debug, Clone, Copy)]
enum SourceStep {
    Frame,
    Nothing,
    Fail,
}

/// Hands out numbered frames, following `steps` first and then always a frame.
struct ScriptedSource {
    steps: VecDeque<SourceStep>,
    next: u64,
}

impl ScriptedSource {
    fn new(steps: impl IntoIterator<Item = SourceStep>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            next: 0,
        }
    }

    fn endless() -> Self {
        Self::new([])
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn acquire(&mut self, _timeout: Duration) -> Result<Option<Frame>, SensorError> {
        match self.steps.pop_front().unwrap_or(SourceStep::Frame) {
            SourceStep::Frame => {
                let frame = frame(self.next);
                self.next += 1;
                Ok(Some(frame))
            }
            SourceStep::Nothing => Ok(None),
            SourceStep::Fail => Err(SensorError::Disconnected(Uuid::nil())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum EngineStep {
    /// Result for the submitted frame becomes available after the delay.
    Echo(Duration),
    /// Ingress stays full for the whole timeout.
    RejectSubmit,
    /// Frame is accepted but no result is ever produced.
    Drop,
    /// Accepted, but the result references a frame that was never submitted.
    Foreign(FrameId),
}

/// Completes results in submission order, like a single tracker queue.
struct ScriptedEngine {
    steps: VecDeque<EngineStep>,
    fallback: EngineStep,
    in_flight: VecDeque<(Instant, TrackingResult)>,
}

impl ScriptedEngine {
    fn new(steps: impl IntoIterator<Item = EngineStep>, fallback: EngineStep) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            fallback,
            in_flight: VecDeque::new(),
        }
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn submit(&mut self, frame: Frame, timeout: Duration) -> Result<bool, EngineError> {
        let now = Instant::now();
        match self.steps.pop_front().unwrap_or(self.fallback) {
            EngineStep::Echo(delay) => {
                self.in_flight
                    .push_back((now + delay, TrackingResult::new(frame, Vec::new())));
            }
            EngineStep::RejectSubmit => {
                sleep(timeout).await;
                return Ok(false);
            }
            EngineStep::Drop => {}
            EngineStep::Foreign(id) => {
                self.in_flight
                    .push_back((now, TrackingResult::new(self::frame(id.sequence()), Vec::new())));
            }
        }
        Ok(true)
    }

    async fn retrieve(&mut self, timeout: Duration) -> Result<Option<TrackingResult>, EngineError> {
        let deadline = Instant::now() + timeout;
        let next_ready = self.in_flight.front().map(|(ready_at, _)| *ready_at);
        match next_ready {
            Some(ready_at) if ready_at <= deadline => {
                sleep_until(ready_at).await;
                Ok(self.in_flight.pop_front().map(|(_, result)| result))
            }
            _ => {
                sleep_until(deadline).await;
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SinkEvent {
    Report(ReportLine),
    SubmitTimeout(FrameId),
    RetrieveTimeout,
    Unmatched(FrameId),
}

#[derive(Clone, Default)]
struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ReportSink for RecordingSink {
    fn report(&mut self, report: &ReportLine) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Report(report.clone()));
    }

    fn submit_timeout(&mut self, frame: FrameId) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::SubmitTimeout(frame));
    }

    fn retrieve_timeout(&mut self) {
        self.events.lock().unwrap().push(SinkEvent::RetrieveTimeout);
    }

    fn unmatched(&mut self, frame: FrameId) {
        self.events.lock().unwrap().push(SinkEvent::Unmatched(frame));
    }
}

fn settings(inter_capture_delay: Duration) -> LoopSettings {
    LoopSettings {
        inter_capture_delay,
        acquire_timeout: Duration::ZERO,
        watchdog_timeout: WATCHDOG,
    }
}

fn pipeline(
    source: ScriptedSource,
    engine: ScriptedEngine,
    inter_capture_delay: Duration,
) -> (PipelineLoop, RecordingSink) {
    let sink = RecordingSink::default();
    let pipeline = PipelineLoop::new(
        Box::new(source),
        Box::new(engine),
        Box::new(sink.clone()),
        settings(inter_capture_delay),
    );
    (pipeline, sink)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

#[tokio::test(start_paused = true)]
async fn steady_stream_reports_fps_and_latency() {
    let source = ScriptedSource::new(
        std::iter::repeat_n(SourceStep::Frame, 25).chain([SourceStep::Nothing]),
    );
    let engine = ScriptedEngine::new([], EngineStep::Echo(Duration::from_millis(15)));
    let (mut pipeline, sink) = pipeline(source, engine, Duration::from_millis(80));

    for _ in 0..25 {
        let iteration = pipeline.run_iteration().await.unwrap();
        assert!(matches!(
            iteration.outcome,
            IterationOutcome::Completed { latency, .. } if latency == Duration::from_millis(15)
        ));
        assert!(iteration.report.is_none());
    }

    let iteration = pipeline.run_iteration().await.unwrap();
    assert_eq!(iteration.outcome, IterationOutcome::NoFrame);
    let report = iteration.report.expect("window should close at 2s");
    assert_eq!(report.elapsed, Duration::from_secs(2));
    assert_eq!(report.frame_count, 25);
    assert_close(report.fps, 12.5);
    assert_close(report.avg_latency_ms, 15.0);

    assert_eq!(pipeline.metrics().frame_count(), 0);
    assert_eq!(pipeline.metrics().latency_ewma(), None);
    assert_eq!(pipeline.tracker().pending(), 0);
    assert_eq!(sink.events(), vec![SinkEvent::Report(report)]);
}

#[tokio::test(start_paused = true)]
async fn slow_retrieve_is_reported_without_touching_metrics() {
    let engine = ScriptedEngine::new(
        [EngineStep::Echo(Duration::from_millis(6_000))],
        EngineStep::Echo(Duration::from_millis(10)),
    );
    let (mut pipeline, sink) = pipeline(ScriptedSource::endless(), engine, Duration::ZERO);

    let start = Instant::now();
    let iteration = pipeline.run_iteration().await.unwrap();
    assert_eq!(iteration.outcome, IterationOutcome::RetrieveTimeout(FrameId::new(0)));
    assert_eq!(start.elapsed(), WATCHDOG);

    assert_eq!(pipeline.metrics().frame_count(), 0);
    assert_eq!(pipeline.metrics().latency_ewma(), None);
    assert!(pipeline.tracker().is_pending(FrameId::new(0)));
    assert_eq!(sink.events()[0], SinkEvent::RetrieveTimeout);
    assert_eq!(pipeline.totals().retrieve_timeouts, 1);
}

#[tokio::test(start_paused = true)]
async fn late_result_is_matched_by_identity_on_a_later_iteration() {
    let engine = ScriptedEngine::new(
        [EngineStep::Echo(Duration::from_millis(6_000))],
        EngineStep::Echo(Duration::from_millis(10)),
    );
    let (mut pipeline, _sink) = pipeline(ScriptedSource::endless(), engine, Duration::ZERO);

    pipeline.run_iteration().await.unwrap();
    let iteration = pipeline.run_iteration().await.unwrap();

    // Frame 0 finished at 6s, while frame 1 was submitted at 5s.
    assert_eq!(
        iteration.outcome,
        IterationOutcome::Completed {
            frame: FrameId::new(0),
            latency: Duration::from_millis(6_000),
        }
    );
    assert!(pipeline.tracker().is_pending(FrameId::new(1)));
    assert_eq!(pipeline.tracker().pending(), 1);
}

#[tokio::test(start_paused = true)]
async fn submit_timeout_leaves_no_pending_entry() {
    let engine = ScriptedEngine::new(
        [EngineStep::RejectSubmit],
        EngineStep::Echo(Duration::from_millis(10)),
    );
    let (mut pipeline, sink) = pipeline(ScriptedSource::endless(), engine, Duration::ZERO);

    let iteration = pipeline.run_iteration().await.unwrap();
    assert_eq!(iteration.outcome, IterationOutcome::SubmitTimeout(FrameId::new(0)));
    assert_eq!(pipeline.tracker().pending(), 0);
    assert_eq!(pipeline.metrics().frame_count(), 0);
    assert_eq!(sink.events()[0], SinkEvent::SubmitTimeout(FrameId::new(0)));

    // No retry: the next iteration moves on to a new frame.
    let iteration = pipeline.run_iteration().await.unwrap();
    assert!(matches!(
        iteration.outcome,
        IterationOutcome::Completed { frame, .. } if frame == FrameId::new(1)
    ));
}

#[tokio::test(start_paused = true)]
async fn dropped_result_stays_pending() {
    let engine = ScriptedEngine::new(
        [EngineStep::Drop],
        EngineStep::Echo(Duration::from_millis(10)),
    );
    let (mut pipeline, _sink) = pipeline(ScriptedSource::endless(), engine, Duration::ZERO);

    assert_eq!(
        pipeline.run_iteration().await.unwrap().outcome,
        IterationOutcome::RetrieveTimeout(FrameId::new(0))
    );
    for _ in 0..3 {
        pipeline.run_iteration().await.unwrap();
    }

    assert_eq!(pipeline.tracker().pending(), 1);
    assert!(pipeline.tracker().is_pending(FrameId::new(0)));
    assert_eq!(pipeline.totals().frames_tracked, 3);
}

#[tokio::test(start_paused = true)]
async fn foreign_result_is_flagged_and_loop_continues() {
    let engine = ScriptedEngine::new(
        [EngineStep::Foreign(FrameId::new(999))],
        EngineStep::Echo(Duration::from_millis(10)),
    );
    let (mut pipeline, sink) = pipeline(ScriptedSource::endless(), engine, Duration::ZERO);

    let iteration = pipeline.run_iteration().await.unwrap();
    assert_eq!(
        iteration.outcome,
        IterationOutcome::Unmatched {
            submitted: FrameId::new(0),
            returned: FrameId::new(999),
        }
    );
    assert_eq!(sink.events(), vec![SinkEvent::Unmatched(FrameId::new(999))]);
    assert_eq!(pipeline.metrics().frame_count(), 1);
    assert_eq!(pipeline.metrics().latency_ewma(), None);

    let iteration = pipeline.run_iteration().await.unwrap();
    assert!(matches!(
        iteration.outcome,
        IterationOutcome::Completed { frame, .. } if frame == FrameId::new(1)
    ));
    assert_eq!(pipeline.totals().unmatched, 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_tracker_still_reports_empty_windows() {
    let engine = ScriptedEngine::new([], EngineStep::Drop);
    let (mut pipeline, sink) = pipeline(ScriptedSource::endless(), engine, Duration::ZERO);

    let iteration = pipeline.run_iteration().await.unwrap();
    let report = iteration.report.expect("5s stall spans a whole window");
    assert_eq!(report.frame_count, 0);
    assert_eq!(report.fps, 0.0);
    assert_eq!(report.avg_latency_ms, 0.0);
    assert_eq!(
        sink.events(),
        vec![SinkEvent::RetrieveTimeout, SinkEvent::Report(report)]
    );
}

#[tokio::test(start_paused = true)]
async fn inter_capture_delay_sets_minimum_cadence() {
    let source = ScriptedSource::new([SourceStep::Nothing; 3]);
    let engine = ScriptedEngine::new([], EngineStep::Drop);
    let (mut pipeline, _sink) = pipeline(source, engine, Duration::from_millis(33));

    let start = Instant::now();
    for _ in 0..3 {
        assert_eq!(
            pipeline.run_iteration().await.unwrap().outcome,
            IterationOutcome::NoFrame
        );
    }
    assert_eq!(start.elapsed(), Duration::from_millis(66));
    assert_eq!(pipeline.totals().idle_ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn sensor_failure_ends_the_loop() {
    let source = ScriptedSource::new([SourceStep::Frame, SourceStep::Fail]);
    let engine = ScriptedEngine::new([], EngineStep::Echo(Duration::from_millis(5)));
    let (mut pipeline, _sink) = pipeline(source, engine, Duration::from_millis(10));

    let result = pipeline.run(CancellationToken::new()).await;
    assert!(matches!(result, Err(AppError::Sensor(_))));
    assert_eq!(pipeline.totals().frames_tracked, 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_iterations() {
    let source = ScriptedSource::new(std::iter::repeat_n(SourceStep::Nothing, 1_000));
    let engine = ScriptedEngine::new([], EngineStep::Drop);
    let (mut pipeline, _sink) = pipeline(source, engine, Duration::from_millis(10));

    let cancel_token = CancellationToken::new();
    let canceller = cancel_token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(95)).await;
        canceller.cancel();
    });

    // Ticks at 0, 10, .., 90 run before the cancel; the tick already waiting
    // for 100ms still completes.
    let totals = pipeline.run(cancel_token).await.unwrap();
    assert_eq!(totals.iterations, 11);
    assert_eq!(totals.idle_ticks, 11);
}

#[tokio::test(start_paused = true)]
async fn totals_count_reports_and_idle_ticks() {
    let source = ScriptedSource::new(std::iter::repeat_n(SourceStep::Nothing, 1_000));
    let engine = ScriptedEngine::new([], EngineStep::Drop);
    let (mut pipeline, sink) = pipeline(source, engine, Duration::from_millis(10));

    let cancel_token = CancellationToken::new();
    let canceller = cancel_token.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(2_055)).await;
        canceller.cancel();
    });

    let totals = pipeline.run(cancel_token).await.unwrap();
    assert_eq!(totals.reports, 1);
    assert_eq!(totals.idle_ticks, totals.iterations);
    assert_eq!(totals.frames_tracked, 0);
    assert_eq!(
        sink.events()
            .iter()
            .filter(|event| matches!(event, SinkEvent::Report(_)))
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn simulated_stack_runs_at_sensor_rate() {
    let configuration = Configuration {
        acquire_timeout_ms: 50,
        sensor: SensorConfiguration {
            fps: 30,
            width: 64,
            height: 48,
        },
        simulation: SimulationConfiguration {
            inference_ms: 25,
            jitter_ms: 0,
            seed: Some(7),
            ..SimulationConfiguration::default()
        },
        ..Configuration::default()
    };

    let sensor = SyntheticSensor::open(&configuration.sensor).unwrap();
    let engine = simulated::start_engine(&configuration).unwrap();
    let sink = RecordingSink::default();
    let mut pipeline = PipelineLoop::new(
        Box::new(sensor),
        Box::new(engine),
        Box::new(sink.clone()),
        LoopSettings::from(&configuration),
    );

    let report = loop {
        if let Some(report) = pipeline.run_iteration().await.unwrap().report {
            break report;
        }
    };

    assert!(report.fps > 29.0 && report.fps < 31.0, "fps {}", report.fps);
    assert_close(report.avg_latency_ms, 25.0);
    assert_eq!(pipeline.tracker().pending(), 0);
    assert_eq!(pipeline.totals().submit_timeouts, 0);
    assert_eq!(pipeline.totals().retrieve_timeouts, 0);
}
