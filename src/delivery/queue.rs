//! FIFO queue for public responses.
//!
//! Only one public job is delivered at a time so two answers never interleave
//! in chat. A single worker task owns the receiving end of a bounded channel
//! and runs each job to completion before taking the next.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use super::job::DeliveryJob;
use super::pacer::DeliveryPacer;

/// Snapshot of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueState {
    /// Jobs waiting behind the one in flight.
    pub pending: usize,
    pub in_flight: bool,
}

impl QueueState {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && !self.in_flight
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("delivery queue for {server} has stopped")]
    Closed { server: String },
}

#[derive(Default)]
struct Counters {
    pending: AtomicUsize,
    in_flight: AtomicBool,
}

/// Handle to a server's public delivery queue.
///
/// Dropping the handle lets the worker drain what is already queued and exit.
pub struct DeliveryQueue {
    server: String,
    tx: mpsc::Sender<DeliveryJob>,
    counters: Arc<Counters>,
}

impl DeliveryQueue {
    /// Start the worker task. `job_delay` separates consecutive jobs.
    pub fn spawn(
        server: impl Into<String>,
        pacer: DeliveryPacer,
        capacity: usize,
        job_delay: Duration,
    ) -> Self {
        let server = server.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        tokio::spawn(run_worker(
            server.clone(),
            rx,
            pacer,
            Arc::clone(&counters),
            job_delay,
        ));
        Self {
            server,
            tx,
            counters,
        }
    }

    /// Append a job. Waits while the queue is at capacity.
    pub async fn enqueue(&self, job: DeliveryJob) -> Result<(), QueueError> {
        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).await.is_err() {
            self.counters.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed {
                server: self.server.clone(),
            });
        }
        let state = self.state();
        tracing::debug!(
            server = %self.server,
            pending = state.pending,
            in_flight = state.in_flight,
            "queued public response"
        );
        Ok(())
    }

    pub fn state(&self) -> QueueState {
        QueueState {
            pending: self.counters.pending.load(Ordering::SeqCst),
            in_flight: self.counters.in_flight.load(Ordering::SeqCst),
        }
    }
}

async fn run_worker(
    server: String,
    mut rx: mpsc::Receiver<DeliveryJob>,
    pacer: DeliveryPacer,
    counters: Arc<Counters>,
    job_delay: Duration,
) {
    while let Some(job) = rx.recv().await {
        counters.in_flight.store(true, Ordering::SeqCst);
        counters.pending.fetch_sub(1, Ordering::SeqCst);
        process_next(&server, &pacer, job).await;
        counters.in_flight.store(false, Ordering::SeqCst);

        if counters.pending.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(job_delay).await;
        }
    }
    tracing::debug!(server = %server, "delivery queue closed");
}

/// Deliver one job in its own task so a panic is contained.
async fn process_next(server: &str, pacer: &DeliveryPacer, job: DeliveryJob) {
    let pacer = pacer.clone();
    let handle = tokio::spawn(async move { pacer.deliver(&job).await });
    match handle.await {
        Ok(report) if report.failed > 0 => {
            tracing::warn!(
                server = %server,
                sent = report.sent,
                failed = report.failed,
                "public response partially delivered"
            );
        }
        Ok(report) => {
            tracing::debug!(server = %server, sent = report.sent, "public response delivered");
        }
        Err(e) => {
            tracing::error!(server = %server, error = %e, "public response task failed");
        }
    }
}
