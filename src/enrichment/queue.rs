//! Bounded worker pool for background enrichment
//!
//! `submit` never blocks: it either enqueues the job and hands back a
//! handle, or reports that the queue is full. Workers drain the queue and
//! publish each job's progress on a watch channel.

use crate::enrichment::{CompanyEnricher, EnrichmentError, EnrichmentJob};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, Notify};

/// Progress of one submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentStatus {
    Pending,
    Running,
    Completed { profiles: usize },
    Failed { message: String },
}

impl EnrichmentStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Observer for a submitted job
#[derive(Debug, Clone)]
pub struct EnrichmentHandle {
    id: u64,
    status: watch::Receiver<EnrichmentStatus>,
}

impl EnrichmentHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current status without waiting
    pub fn status(&self) -> EnrichmentStatus {
        self.status.borrow().clone()
    }

    /// Waits until the job completes or fails
    pub async fn wait(mut self) -> EnrichmentStatus {
        loop {
            let current = self.status.borrow_and_update().clone();
            if current.is_finished() {
                return current;
            }
            if self.status.changed().await.is_err() {
                // Worker gone; report the last value it published
                return self.status.borrow().clone();
            }
        }
    }
}

struct QueuedJob {
    id: u64,
    job: EnrichmentJob,
    status: watch::Sender<EnrichmentStatus>,
}

/// Jobs submitted but not yet finished, with a wakeup for `wait_idle`
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn finish_one(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Bounded queue drained by a fixed set of worker tasks
pub struct EnrichmentQueue {
    sender: mpsc::Sender<QueuedJob>,
    next_id: AtomicU64,
    in_flight: Arc<InFlight>,
}

impl EnrichmentQueue {
    /// Spawns `workers` tasks on the current tokio runtime
    pub fn start(enricher: Arc<dyn CompanyEnricher>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(InFlight::default());

        for worker in 0..workers.max(1) {
            tokio::spawn(run_worker(
                worker,
                Arc::clone(&receiver),
                Arc::clone(&enricher),
                Arc::clone(&in_flight),
            ));
        }

        Self {
            sender,
            next_id: AtomicU64::new(1),
            in_flight,
        }
    }

    /// Enqueues a job without waiting for room
    pub fn submit(&self, job: EnrichmentJob) -> Result<EnrichmentHandle, EnrichmentError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (status_tx, status_rx) = watch::channel(EnrichmentStatus::Pending);

        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        let queued = QueuedJob {
            id,
            job,
            status: status_tx,
        };

        match self.sender.try_send(queued) {
            Ok(()) => Ok(EnrichmentHandle {
                id,
                status: status_rx,
            }),
            Err(e) => {
                self.in_flight.finish_one();
                Err(match e {
                    mpsc::error::TrySendError::Full(_) => EnrichmentError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => EnrichmentError::QueueClosed,
                })
            }
        }
    }

    /// Jobs submitted and not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Waits until every submitted job has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    enricher: Arc<dyn CompanyEnricher>,
    in_flight: Arc<InFlight>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let queued = match next {
            Some(queued) => queued,
            None => break,
        };

        queued.status.send_replace(EnrichmentStatus::Running);
        tracing::debug!(
            "Enrichment worker {} running job {} for {}",
            worker,
            queued.id,
            queued.job.site_name
        );

        let outcome = AssertUnwindSafe(enricher.enrich(&queued.job))
            .catch_unwind()
            .await;

        let status = match outcome {
            Ok(Ok(profiles)) => EnrichmentStatus::Completed {
                profiles: profiles.len(),
            },
            Ok(Err(e)) => {
                tracing::warn!("Enrichment job {} failed: {}", queued.id, e);
                EnrichmentStatus::Failed {
                    message: e.to_string(),
                }
            }
            Err(_) => {
                tracing::error!("Enrichment job {} panicked", queued.id);
                EnrichmentStatus::Failed {
                    message: "enricher panicked".to_string(),
                }
            }
        };

        queued.status.send_replace(status);
        in_flight.finish_one();
    }

    tracing::trace!("Enrichment worker {} stopped", worker);
}
