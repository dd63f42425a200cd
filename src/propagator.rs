//! Best-effort delivery of scores to an external collector.
//!
//! Submissions enqueue a [`PropagationJob`] without waiting; a single worker
//! task drains the queue and hands each job to a [`ScoreCollector`]. Delivery
//! is at-most-once: a full queue, a network error or a non-success status
//! drops the job after logging it. Jobs are enqueued after the registry lock
//! is released, so two submissions to one board may reach the collector in
//! either order.

use crate::game::{BoardId, ScoreUpdate};
use async_trait::async_trait;
use derive_more::{Display, Error};
use derive_new::new;
use reqwest::Url;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Path appended to the collector base URL.
pub const SCORES_PATH: &str = "scores";

/// Propagation error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Propagation error: {} at {}:{}", message, file, line)]
pub struct PropagationError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PropagationError {
    /// Creates a new propagation error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for PropagationError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        Self::new(format!("HTTP error: {}", err))
    }
}

/// Receiver of score updates.
#[async_trait]
pub trait ScoreCollector: Send + Sync + std::fmt::Debug {
    /// Delivers the latest scores for one board.
    async fn put_scores(
        &self,
        board_id: &str,
        update: ScoreUpdate,
    ) -> Result<(), PropagationError>;
}

/// Collector reached over HTTP: `PUT {base}/scores?id={board_id}`.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    scores_url: Url,
    client: reqwest::Client,
}

impl HttpCollector {
    /// Creates a collector client for the given base URL.
    ///
    /// Every request is abandoned after `timeout`.
    #[instrument]
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PropagationError> {
        let base = base_url.trim_end_matches('/');
        let scores_url = Url::parse(&format!("{}/{}", base, SCORES_PATH)).map_err(|e| {
            PropagationError::new(format!("Invalid collector URL '{}': {}", base_url, e))
        })?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(url = %scores_url, "Using score collector");
        Ok(Self { scores_url, client })
    }

    /// URL scores are sent to, without the board query.
    pub fn scores_url(&self) -> &Url {
        &self.scores_url
    }
}

#[async_trait]
impl ScoreCollector for HttpCollector {
    #[instrument(skip(self, update), fields(master_score = update.master_score, slave_score = update.slave_score))]
    async fn put_scores(
        &self,
        board_id: &str,
        update: ScoreUpdate,
    ) -> Result<(), PropagationError> {
        let mut url = self.scores_url.clone();
        url.query_pairs_mut().append_pair("id", board_id);

        debug!(%url, "Sending PUT");
        let response = self.client.put(url).json(&update).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PropagationError::new(format!(
                "Collector responded {}: {}",
                status, body
            )));
        }

        debug!(%status, body = %body, "Collector accepted scores");
        Ok(())
    }
}

/// Collector used when none is configured. Drops every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardCollector;

#[async_trait]
impl ScoreCollector for DiscardCollector {
    #[instrument(skip(self, update))]
    async fn put_scores(
        &self,
        board_id: &str,
        update: ScoreUpdate,
    ) -> Result<(), PropagationError> {
        debug!(?update, "No collector configured, discarding scores");
        Ok(())
    }
}

/// One queued delivery.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct PropagationJob {
    /// Board the scores belong to.
    pub board_id: BoardId,
    /// Scores to deliver.
    pub update: ScoreUpdate,
}

/// Count of jobs queued or in flight, shared with the worker.
///
/// Stays readable after every [`Propagator`] is dropped, so shutdown can
/// report what it abandons.
#[derive(Debug, Clone, Default)]
pub struct PendingJobs(Arc<AtomicUsize>);

impl PendingJobs {
    /// Jobs accepted but not yet handed off to the collector.
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn decrement(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle for enqueueing score deliveries.
///
/// The worker stops once every handle is dropped and the queue is empty.
#[derive(Debug, Clone)]
pub struct Propagator {
    sender: mpsc::Sender<PropagationJob>,
    pending: PendingJobs,
}

impl Propagator {
    /// Starts the delivery worker on the current Tokio runtime.
    ///
    /// `capacity` bounds the number of pending jobs.
    #[instrument(skip(collector))]
    pub fn spawn(
        collector: Arc<dyn ScoreCollector>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let pending = PendingJobs::default();
        let worker = tokio::spawn(run_worker(receiver, collector, pending.clone()));
        info!(capacity, "Propagation worker started");
        (Self { sender, pending }, worker)
    }

    /// Shared count of undelivered jobs.
    pub fn pending_jobs(&self) -> PendingJobs {
        self.pending.clone()
    }

    /// Queues scores for delivery without waiting.
    ///
    /// Returns false if the job was dropped because the queue is full or the
    /// worker has stopped.
    #[instrument(skip(self, update))]
    pub fn enqueue(&self, board_id: &str, update: ScoreUpdate) -> bool {
        // Counted before sending so the worker never decrements below zero.
        self.pending.increment();
        match self
            .sender
            .try_send(PropagationJob::new(board_id.to_string(), update))
        {
            Ok(()) => {
                debug!("Propagation queued");
                true
            }
            Err(TrySendError::Full(job)) => {
                self.pending.decrement();
                warn!(board_id = %job.board_id, "Propagation queue full, dropping scores");
                false
            }
            Err(TrySendError::Closed(job)) => {
                self.pending.decrement();
                warn!(board_id = %job.board_id, "Propagation worker stopped, dropping scores");
                false
            }
        }
    }
}

/// Waits up to `limit` for the worker to finish the queue.
///
/// On timeout the worker is aborted and the number of abandoned jobs is
/// returned; zero means everything queued was handed to the collector.
#[instrument(skip(worker, pending))]
pub async fn drain_worker(
    mut worker: JoinHandle<()>,
    pending: &PendingJobs,
    limit: Duration,
) -> usize {
    match tokio::time::timeout(limit, &mut worker).await {
        Ok(Ok(())) => {
            info!("Propagation queue drained");
            0
        }
        Ok(Err(e)) => {
            let abandoned = pending.count();
            warn!(error = %e, abandoned, "Propagation worker ended abnormally");
            abandoned
        }
        Err(_) => {
            worker.abort();
            let abandoned = pending.count();
            warn!(abandoned, "Propagation drain timed out, abandoning queued scores");
            abandoned
        }
    }
}

#[instrument(skip_all)]
async fn run_worker(
    mut receiver: mpsc::Receiver<PropagationJob>,
    collector: Arc<dyn ScoreCollector>,
    pending: PendingJobs,
) {
    while let Some(job) = receiver.recv().await {
        match collector.put_scores(&job.board_id, job.update).await {
            Ok(()) => info!(board_id = %job.board_id, "Scores propagated"),
            Err(e) => warn!(board_id = %job.board_id, error = %e, "Score propagation failed"),
        }
        pending.decrement();
    }
    info!("Propagation worker stopped");
}
