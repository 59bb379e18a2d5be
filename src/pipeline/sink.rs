use std::io::{self, Write};

use super::metrics::ReportLine;
use crate::common::FrameId;
use crate::config::ReportFormat;

/// Receives the user-facing output of the pipeline loop.
pub trait ReportSink: Send {
    fn report(&mut self, report: &ReportLine);
    fn submit_timeout(&mut self, frame: FrameId);
    fn retrieve_timeout(&mut self);
    fn unmatched(&mut self, frame: FrameId);
}

/// Reports and timeouts on stdout, anomalies on stderr.
pub struct ConsoleSink<O, E> {
    format: ReportFormat,
    out: O,
    err: E,
}

impl ConsoleSink<io::Stdout, io::Stderr> {
    pub fn stdio(format: ReportFormat) -> Self {
        Self::new(format, io::stdout(), io::stderr())
    }
}

impl<O: Write + Send, E: Write + Send> ConsoleSink<O, E> {
    pub fn new(format: ReportFormat, out: O, err: E) -> Self {
        Self { format, out, err }
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }

    fn write_out(&mut self, plain: &str, json: serde_json::Value) {
        let result = match self.format {
            ReportFormat::Plain => writeln!(self.out, "{plain}"),
            ReportFormat::Json => writeln!(self.out, "{json}"),
        };
        if let Err(e) = result.and_then(|_| self.out.flush()) {
            tracing::error!("Failed to write report output: {}", e);
        }
    }
}

impl<O: Write + Send, E: Write + Send> ReportSink for ConsoleSink<O, E> {
    fn report(&mut self, report: &ReportLine) {
        let json = serde_json::to_value(report).unwrap_or_default();
        self.write_out(&report.to_string(), json);
    }

    fn submit_timeout(&mut self, frame: FrameId) {
        self.write_out(
            "submit timeout",
            serde_json::json!({ "event": "submit_timeout", "frame": frame }),
        );
    }

    fn retrieve_timeout(&mut self) {
        self.write_out(
            "retrieve timeout",
            serde_json::json!({ "event": "retrieve_timeout" }),
        );
    }

    fn unmatched(&mut self, frame: FrameId) {
        if let Err(e) = writeln!(
            self.err,
            "got result for frame {frame} that was never submitted for tracking"
        ) {
            tracing::error!("Failed to write anomaly output: {}", e);
        }
    }
}
