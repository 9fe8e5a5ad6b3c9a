//! Background processing sweep
//!
//! Periodically re-runs artifacts the synchronous path never settled: uploads
//! dropped by a full queue or a crash (still `PENDING`) and earlier failures
//! (`FAILED`). Each run takes at most `batch_limit` candidates, oldest first.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use reelforge_core::AppError;
use reelforge_processing::ProcessingStateMachine;

/// Result of one sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// Nothing to do.
    Idle,
    Ran { succeeded: usize, failed: usize },
}

#[derive(Clone)]
pub struct ProcessingSweep {
    machine: ProcessingStateMachine,
    batch_limit: i64,
    interval: Duration,
}

impl ProcessingSweep {
    pub fn new(machine: ProcessingStateMachine, batch_limit: i64, interval: Duration) -> Self {
        Self {
            machine,
            batch_limit: batch_limit.max(1),
            interval,
        }
    }

    /// One pass: find candidates, skip anything already in flight, process the rest.
    #[tracing::instrument(skip(self), fields(batch_limit = self.batch_limit))]
    pub async fn run_once(&self) -> Result<SweepOutcome, AppError> {
        let candidates = self
            .machine
            .repository()
            .find_processing_candidates(self.batch_limit)
            .await?;

        let in_flight = self.machine.in_flight();
        let ids: Vec<Uuid> = candidates
            .iter()
            .map(|artifact| artifact.id)
            .filter(|id| !in_flight.contains(id))
            .collect();

        let skipped = candidates.len() - ids.len();
        if skipped > 0 {
            tracing::debug!(skipped = skipped, "Skipping artifacts already in flight");
        }

        if ids.is_empty() {
            return Ok(SweepOutcome::Idle);
        }

        tracing::info!(count = ids.len(), "Sweeping unprocessed artifacts");
        let batch = self.machine.process_many(&ids).await;

        Ok(SweepOutcome::Ran {
            succeeded: batch.succeeded,
            failed: batch.failed,
        })
    }

    /// Spawn the periodic sweep. The first pass runs immediately.
    pub fn start(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            batch_limit = self.batch_limit,
            "Starting background processing sweep"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("Background processing sweep stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        match self.run_once().await {
                            Ok(SweepOutcome::Idle) => {
                                tracing::debug!("Sweep found no artifacts to process");
                            }
                            Ok(SweepOutcome::Ran { succeeded, failed }) => {
                                tracing::info!(
                                    succeeded = succeeded,
                                    failed = failed,
                                    "Sweep run finished"
                                );
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Sweep run failed");
                            }
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use reelforge_core::{ProcessingStatus, UploaderRole};
    use reelforge_db::ArtifactRepository;

    use crate::test_support::{harness, seed_video, wait_for_status};

    fn sweep(machine: ProcessingStateMachine, limit: i64) -> ProcessingSweep {
        ProcessingSweep::new(machine, limit, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_idle_when_nothing_to_do() {
        let h = harness().await;
        seed_video(&h, UploaderRole::Admin, ProcessingStatus::Completed, Utc::now()).await;

        let outcome = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(outcome, SweepOutcome::Idle);
    }

    #[tokio::test]
    async fn test_processes_oldest_first_up_to_limit() {
        let h = harness().await;
        let now = Utc::now();
        let mut ids = Vec::new();
        for age_minutes in (1..=7).rev() {
            let status = if age_minutes % 2 == 0 {
                ProcessingStatus::Failed
            } else {
                ProcessingStatus::Pending
            };
            let created = now - ChronoDuration::minutes(age_minutes);
            ids.push(seed_video(&h, UploaderRole::Admin, status, created).await);
        }

        let outcome = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(
            outcome,
            SweepOutcome::Ran {
                succeeded: 5,
                failed: 0
            }
        );

        // ids were seeded oldest first
        for id in &ids[..5] {
            let artifact = h.repo.get(*id).await.unwrap().unwrap();
            assert_eq!(artifact.processing_status, ProcessingStatus::Completed);
        }
        for id in &ids[5..] {
            let artifact = h.repo.get(*id).await.unwrap().unwrap();
            assert_ne!(artifact.processing_status, ProcessingStatus::Completed);
        }

        let second = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(
            second,
            SweepOutcome::Ran {
                succeeded: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_the_run() {
        let h = harness().await;
        let ago = |minutes| Utc::now() - ChronoDuration::minutes(minutes);
        let a = seed_video(&h, UploaderRole::Editor, ProcessingStatus::Pending, ago(3)).await;
        let b = seed_video(&h, UploaderRole::Editor, ProcessingStatus::Failed, ago(2)).await;
        let c = seed_video(&h, UploaderRole::Editor, ProcessingStatus::Pending, ago(1)).await;
        h.extractor.fail_for.lock().unwrap().insert(b);

        let outcome = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(
            outcome,
            SweepOutcome::Ran {
                succeeded: 2,
                failed: 1
            }
        );
        for id in [a, c] {
            let artifact = h.repo.get(id).await.unwrap().unwrap();
            assert_eq!(artifact.processing_status, ProcessingStatus::Completed);
        }
        let failed = h.repo.get(b).await.unwrap().unwrap();
        assert_eq!(failed.processing_status, ProcessingStatus::Failed);
        assert!(failed.processing_error.is_some());
    }

    #[tokio::test]
    async fn test_awaiting_approval_is_not_swept_again() {
        let h = harness().await;
        let id = seed_video(&h, UploaderRole::Contributor, ProcessingStatus::Pending, Utc::now()).await;

        let first = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(
            first,
            SweepOutcome::Ran {
                succeeded: 1,
                failed: 0
            }
        );
        let artifact = h.repo.get(id).await.unwrap().unwrap();
        assert!(artifact.is_awaiting_approval());

        let second = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(second, SweepOutcome::Idle);
    }

    #[tokio::test]
    async fn test_skips_in_flight_artifacts() {
        let h = harness().await;
        let busy = seed_video(&h, UploaderRole::Admin, ProcessingStatus::Pending, Utc::now()).await;
        let _guard = h.machine.in_flight().try_acquire(busy).unwrap();

        let outcome = sweep(h.machine.clone(), 5).run_once().await.unwrap();
        assert_eq!(outcome, SweepOutcome::Idle);
        let artifact = h.repo.get(busy).await.unwrap().unwrap();
        assert_eq!(artifact.processing_status, ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn test_started_sweep_runs_and_stops() {
        let h = harness().await;
        let id = seed_video(&h, UploaderRole::Admin, ProcessingStatus::Failed, Utc::now()).await;

        let shutdown = CancellationToken::new();
        let handle = sweep(h.machine.clone(), 5).start(shutdown.clone());

        wait_for_status(&h.repo, id, ProcessingStatus::Completed).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("sweep did not stop")
            .unwrap();
    }
}
