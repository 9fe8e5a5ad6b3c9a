//! Fire-and-forget processing queue
//!
//! Receives media ids from the upload finalizer and runs them through the
//! processing state machine on a bounded worker pool. Submission never blocks
//! and never fails the caller: when the channel is full the artifact simply
//! stays `PENDING` and the background sweep picks it up later.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use reelforge_core::AppError;
use reelforge_processing::ProcessingStateMachine;
use reelforge_upload::ProcessingHandoff;

#[derive(Debug, Clone)]
pub struct ProcessingJobQueue {
    tx: mpsc::Sender<Uuid>,
}

impl ProcessingJobQueue {
    /// Create the queue and spawn its worker pool.
    ///
    /// At most `max_concurrent` artifacts are processed at once; up to
    /// `queue_size` more wait in the channel.
    pub fn new(machine: ProcessingStateMachine, max_concurrent: usize, queue_size: usize) -> Self {
        let queue_size = queue_size.max(1);
        let max_concurrent = max_concurrent.max(1);
        let (tx, rx) = mpsc::channel(queue_size);

        tokio::spawn(async move {
            Self::worker_pool(rx, machine, max_concurrent).await;
        });

        tracing::info!(
            queue_size = queue_size,
            max_concurrent = max_concurrent,
            "Processing job queue initialized with bounded channel"
        );

        Self { tx }
    }

    /// Enqueue `media_id`. Returns `false` when it was dropped (queue full or closed).
    #[tracing::instrument(skip(self), fields(job.type = "process_video"))]
    pub fn submit(&self, media_id: Uuid) -> bool {
        match self.tx.try_send(media_id) {
            Ok(()) => {
                tracing::debug!("Enqueued processing job");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Processing queue is full; artifact left PENDING for the sweep");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::error!("Processing queue is closed; artifact left PENDING for the sweep");
                false
            }
        }
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<Uuid>,
        machine: ProcessingStateMachine,
        max_concurrent: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        while let Some(media_id) = rx.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let machine = machine.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::process_job(&machine, media_id).await;
            });
        }

        tracing::info!("Processing job queue worker pool stopped");
    }

    async fn process_job(machine: &ProcessingStateMachine, media_id: Uuid) {
        match machine.process(media_id).await {
            Ok(artifact) => {
                tracing::info!(
                    media_id = %media_id,
                    status = %artifact.processing_status,
                    "Processing job finished"
                );
            }
            Err(AppError::AlreadyInFlight(_)) => {
                tracing::debug!(media_id = %media_id, "Artifact already being processed; job skipped");
            }
            Err(e) => {
                tracing::error!(media_id = %media_id, error = %e, "Processing job failed");
            }
        }
    }
}

impl ProcessingHandoff for ProcessingJobQueue {
    fn submit(&self, media_id: Uuid) {
        ProcessingJobQueue::submit(self, media_id);
    }
}
