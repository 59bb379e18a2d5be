use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{BodyTracker, InferenceEngine};
use crate::common::{Frame, TrackingResult};
use crate::error::EngineError;

/// Runs a [`BodyTracker`] on its own task between two bounded queues.
pub struct QueuedEngine {
    ingress_tx: Sender<Frame>,
    egress_rx: Receiver<TrackingResult>,
    cancel_token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl QueuedEngine {
    pub fn start<T: BodyTracker>(tracker: T, ingress_capacity: usize, egress_capacity: usize) -> Self {
        let (ingress_tx, ingress_rx) = mpsc::channel(ingress_capacity);
        let (egress_tx, egress_rx) = mpsc::channel(egress_capacity);
        let cancel_token = CancellationToken::new();
        let worker = Self::start_worker(tracker, ingress_rx, egress_tx, cancel_token.clone());

        Self {
            ingress_tx,
            egress_rx,
            cancel_token,
            worker: Some(worker),
        }
    }

    fn start_worker<T: BodyTracker>(
        mut tracker: T,
        mut ingress_rx: Receiver<Frame>,
        egress_tx: Sender<TrackingResult>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Tracker worker started");
            loop {
                let frame = tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    frame = ingress_rx.recv() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                };

                let frame_id = frame.id();
                let result = tracker.track(frame).await;
                tracing::debug!("Tracked frame {} with {} bodies", frame_id, result.num_bodies());

                // Egress full blocks the worker, which in turn backs up ingress.
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    sent = egress_tx.send(result) => {
                        if sent.is_err() {
                            tracing::warn!("Result queue closed, stopping tracker worker");
                            break;
                        }
                    }
                }
            }
            tracing::info!("Tracker worker stopped");
        })
    }

    pub fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl Drop for QueuedEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[async_trait]
impl InferenceEngine for QueuedEngine {
    async fn submit(&mut self, frame: Frame, timeout: Duration) -> Result<bool, EngineError> {
        match tokio::time::timeout(timeout, self.ingress_tx.send(frame)).await {
            Ok(Ok(())) => Ok(true),
            Ok(Err(_)) => Err(EngineError::Stopped),
            Err(_) => Ok(false),
        }
    }

    async fn retrieve(&mut self, timeout: Duration) -> Result<Option<TrackingResult>, EngineError> {
        match tokio::time::timeout(timeout, self.egress_rx.recv()).await {
            Ok(Some(result)) => Ok(Some(result)),
            Ok(None) => Err(EngineError::Stopped),
            Err(_) => Ok(None),
        }
    }
}
