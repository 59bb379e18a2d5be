use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Length of one reporting window.
pub const REPORT_WINDOW: Duration = Duration::from_secs(2);

/// EWMA smoothing factor applied to each new latency sample.
pub const LATENCY_ALPHA: f64 = 0.1;

/// One line of benchmark output, covering a single reporting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub fps: f64,
    pub avg_latency_ms: f64,
    pub frame_count: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {:.2}", self.fps, self.avg_latency_ms)
    }
}

/// Throughput and end-to-end latency for the current reporting window.
///
/// The latency average is per window: it is cleared at every boundary so each
/// report reflects only recent behaviour.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    window_start: Instant,
    frame_count: u64,
    latency_ewma: Option<f64>,
}

impl MetricsAggregator {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frame_count: 0,
            latency_ewma: None,
        }
    }

    pub fn record_frame(&mut self) {
        self.frame_count += 1;
    }

    pub fn record_latency(&mut self, latency: Duration) {
        let sample = latency.as_secs_f64() * 1_000.0;
        self.latency_ewma = Some(update_ewma(self.latency_ewma, sample, LATENCY_ALPHA));
    }

    /// Close the window if it has run its full length, returning its report
    /// and starting a fresh window at `now`. Before that, nothing changes.
    pub fn maybe_report(&mut self, now: Instant) -> Option<ReportLine> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < REPORT_WINDOW {
            return None;
        }

        let report = ReportLine {
            fps: self.frame_count as f64 / elapsed.as_secs_f64(),
            avg_latency_ms: self.latency_ewma.unwrap_or(0.0),
            frame_count: self.frame_count,
            elapsed,
        };

        self.frame_count = 0;
        self.latency_ewma = None;
        self.window_start = now;
        Some(report)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn latency_ewma(&self) -> Option<f64> {
        self.latency_ewma
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}

/// Seeded by the first sample, then `(1 - alpha) * current + alpha * sample`.
fn update_ewma(current: Option<f64>, sample: f64, alpha: f64) -> f64 {
    match current {
        Some(current) => current * (1.0 - alpha) + sample * alpha,
        None => sample,
    }
}
